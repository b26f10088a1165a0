// =============================================================================
// Average True Range (ATR) — rolling-mean form
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR_0 = H - L                                   (no previous close yet)
//   TR_t = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is the simple rolling mean of TR over `period` bars, so the first ATR
// value sits at index `period - 1`.
//
// Default period: 14
// =============================================================================

use crate::market_data::Candle;

use super::{last_value, rolling_mean};

/// True range of every bar, aligned with `candles`.
///
/// A bar with a non-finite high, low or previous close yields `NaN`, which
/// leaves every ATR window containing it undefined.
pub fn true_range_series(candles: &[Candle]) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    for (i, c) in candles.iter().enumerate() {
        if !c.high.is_finite() || !c.low.is_finite() {
            out.push(f64::NAN);
            continue;
        }
        let hl = c.high - c.low;
        if i == 0 {
            out.push(hl);
            continue;
        }
        let prev_close = candles[i - 1].close;
        if !prev_close.is_finite() {
            out.push(f64::NAN);
            continue;
        }
        let hc = (c.high - prev_close).abs();
        let lc = (c.low - prev_close).abs();
        out.push(hl.max(hc).max(lc));
    }
    out
}

/// ATR aligned with `candles`.
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let tr: Vec<Option<f64>> = true_range_series(candles).into_iter().map(Some).collect();
    rolling_mean(&tr, period)
}

/// Compute the most recent ATR value.
///
/// # Returns
/// `None` when:
/// - `period` is zero.
/// - There are fewer than `period` candles.
/// - Any TR in the latest window is non-finite.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    last_value(&atr_series(candles, period))
}

/// Ratio of the current ATR to its own trailing mean.
///
/// The mean covers the last `lookback` bars of the ATR series (only defined
/// values count), or the whole series when fewer than `lookback` bars exist.
/// Returns `None` when the current ATR is undefined or the mean is zero.
pub fn atr_ratio(candles: &[Candle], period: usize, lookback: usize) -> Option<f64> {
    let series = atr_series(candles, period);
    let current = last_value(&series)?;

    let window = if series.len() >= lookback {
        &series[series.len() - lookback..]
    } else {
        &series[..]
    };
    let defined: Vec<f64> = window.iter().flatten().copied().collect();
    if defined.is_empty() {
        return None;
    }
    let mean = defined.iter().sum::<f64>() / defined.len() as f64;
    if mean <= 0.0 || !mean.is_finite() {
        return None;
    }

    let ratio = current / mean;
    ratio.is_finite().then_some(ratio)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// Build a test candle with the given OHLC values.
    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open_time: 0,
            open,
            high,
            low,
            close,
            volume: 100,
        }
    }

    #[test]
    fn atr_period_zero() {
        let candles = vec![candle(100.0, 105.0, 95.0, 102.0); 20];
        assert!(calculate_atr(&candles, 0).is_none());
    }

    #[test]
    fn atr_insufficient_data() {
        let candles = vec![candle(100.0, 105.0, 95.0, 102.0); 10];
        assert!(calculate_atr(&candles, 14).is_none());
    }

    #[test]
    fn atr_exact_minimum_data() {
        let candles = vec![
            candle(100.0, 102.0, 98.0, 101.0),
            candle(101.0, 104.0, 99.0, 103.0),
            candle(103.0, 106.0, 100.0, 105.0),
        ];
        // TR = [4, 5, 6] => mean 5
        let atr = calculate_atr(&candles, 3).unwrap();
        assert!((atr - 5.0).abs() < 1e-12);
    }

    #[test]
    fn atr_constant_range() {
        let candles: Vec<Candle> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                candle(base, base + 5.0, base - 5.0, base)
            })
            .collect();
        let atr = calculate_atr(&candles, 14).unwrap();
        assert!((atr - 10.0).abs() < 0.2, "expected ATR near 10.0, got {atr}");
    }

    #[test]
    fn atr_true_range_uses_prev_close() {
        let candles = vec![
            candle(100.0, 105.0, 95.0, 95.0),
            candle(110.0, 115.0, 108.0, 112.0), // |115-95| = 20 > 7
        ];
        let tr = true_range_series(&candles);
        assert_eq!(tr, vec![10.0, 20.0]);
    }

    #[test]
    fn atr_nan_returns_none() {
        let candles = vec![
            candle(100.0, 105.0, 95.0, 100.0),
            candle(100.0, f64::NAN, 95.0, 100.0),
            candle(100.0, 105.0, 95.0, 100.0),
            candle(100.0, 105.0, 95.0, 100.0),
        ];
        assert!(calculate_atr(&candles, 3).is_none());
    }

    #[test]
    fn ratio_is_one_for_steady_volatility() {
        let candles: Vec<Candle> = (0..80)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.01;
                candle(base, base + 1.0, base - 1.0, base)
            })
            .collect();
        let ratio = atr_ratio(&candles, 14, 50).unwrap();
        assert!((ratio - 1.0).abs() < 0.05, "got {ratio}");
    }

    #[test]
    fn ratio_rises_with_expanding_ranges() {
        let mut candles: Vec<Candle> = (0..60).map(|_| candle(100.0, 101.0, 99.0, 100.0)).collect();
        for _ in 0..14 {
            candles.push(candle(100.0, 103.0, 97.0, 100.0));
        }
        let ratio = atr_ratio(&candles, 14, 50).unwrap();
        assert!(ratio > 1.5, "got {ratio}");
    }

    #[test]
    fn ratio_zero_mean_is_none() {
        let candles = vec![candle(100.0, 100.0, 100.0, 100.0); 30];
        assert!(atr_ratio(&candles, 14, 50).is_none());
    }

    #[test]
    fn ratio_uses_whole_series_when_short() {
        let candles: Vec<Candle> = (0..20).map(|_| candle(100.0, 101.0, 99.0, 100.0)).collect();
        let ratio = atr_ratio(&candles, 14, 50).unwrap();
        assert!((ratio - 1.0).abs() < 1e-12);
    }
}
