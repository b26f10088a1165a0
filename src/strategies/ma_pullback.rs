// =============================================================================
// Moving-Average Pullback Strategy
// =============================================================================
//
// Trend continuation entries: the fast/medium/slow simple MAs must be
// strictly stacked for at least `min_alignment_bars` consecutive bars
// (counted back over at most `lookback_bars`), and the latest close must sit
// inside a band around one of the MAs.  The fastest MA is checked first:
//
//   fast MA   +/- 0.2%   90 (>= 5 aligned bars) / 80
//   medium MA +/- 0.2%   80 / 70
//   slow MA   +/- 0.3%   70 / 60
//
// An aligned stack with price away from every MA contributes nothing.

use tracing::debug;

use crate::indicators::sma::sma_series;
use crate::market_data::{Series, SeriesByTimeframe};
use crate::runtime_config::PullbackParams;
use crate::types::Timeframe;

use super::{
    Pattern, SignalBasis, Strategy, StrategyKind, StrategyResult, TimeframeReading, Verdict,
};

pub struct MaPullbackStrategy {
    params: PullbackParams,
}

impl MaPullbackStrategy {
    pub fn new(params: PullbackParams) -> Self {
        Self { params }
    }

    fn read_timeframe(&self, timeframe: Timeframe, series: Option<&Series>) -> TimeframeReading {
        let Some(series) = series else {
            return TimeframeReading::unavailable(timeframe);
        };
        if series.len() < self.params.slow + self.params.min_alignment_bars {
            return TimeframeReading::unavailable(timeframe);
        }

        let closes = series.closes();
        let fast = sma_series(&closes, self.params.fast);
        let medium = sma_series(&closes, self.params.medium);
        let slow = sma_series(&closes, self.params.slow);

        let (direction, bars_aligned) = self.alignment(&fast, &medium, &slow);
        if direction == 0 || bars_aligned < self.params.min_alignment_bars {
            return TimeframeReading::weighted(timeframe, 0, 0, Pattern::None);
        }

        let last = closes.len() - 1;
        let (Some(price), Some(f), Some(m), Some(s)) =
            (closes.last().copied(), fast[last], medium[last], slow[last])
        else {
            return TimeframeReading::unavailable(timeframe);
        };

        match self.classify(price, f, m, s, bars_aligned) {
            Some((strength, pattern)) => {
                debug!(
                    %timeframe,
                    direction,
                    bars_aligned,
                    ?pattern,
                    strength,
                    "MA pullback detected"
                );
                TimeframeReading::weighted(timeframe, direction, strength, pattern)
            }
            None => TimeframeReading::weighted(timeframe, 0, 0, Pattern::None),
        }
    }

    /// Current stack direction and how many consecutive bars, ending at the
    /// last one, share it.
    fn alignment(
        &self,
        fast: &[Option<f64>],
        medium: &[Option<f64>],
        slow: &[Option<f64>],
    ) -> (i8, usize) {
        let stacked = |i: usize| -> i8 {
            match (fast[i], medium[i], slow[i]) {
                (Some(f), Some(m), Some(s)) if f > m && m > s => 1,
                (Some(f), Some(m), Some(s)) if f < m && m < s => -1,
                _ => 0,
            }
        };

        let Some(last) = fast.len().checked_sub(1) else {
            return (0, 0);
        };
        let direction = stacked(last);
        if direction == 0 {
            return (0, 0);
        }

        let bars = (0..=last)
            .rev()
            .take(self.params.lookback_bars)
            .take_while(|&i| stacked(i) == direction)
            .count();
        (direction, bars)
    }

    /// Which MA the price is pulling back to, if any, with its strength.
    fn classify(
        &self,
        price: f64,
        fast: f64,
        medium: f64,
        slow: f64,
        bars_aligned: usize,
    ) -> Option<(u8, Pattern)> {
        let established = bars_aligned >= self.params.strong_alignment_bars;
        let within = |ma: f64, band_pct: f64| -> bool {
            if ma == 0.0 {
                return false;
            }
            ((price - ma) / ma * 100.0).abs() <= band_pct
        };

        if within(fast, self.params.fast_band_pct) {
            Some((if established { 90 } else { 80 }, Pattern::PullbackFast))
        } else if within(medium, self.params.medium_band_pct) {
            Some((if established { 80 } else { 70 }, Pattern::PullbackMedium))
        } else if within(slow, self.params.slow_band_pct) {
            Some((if established { 70 } else { 60 }, Pattern::PullbackSlow))
        } else {
            None
        }
    }
}

impl Strategy for MaPullbackStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MaPullback
    }

    fn analyze(&self, series: &SeriesByTimeframe) -> StrategyResult {
        let readings = Timeframe::ALL
            .iter()
            .map(|&tf| self.read_timeframe(tf, series.get(tf)))
            .collect();
        StrategyResult::from_readings(StrategyKind::MaPullback, readings, |raw, pulled_back| {
            Verdict::weighted(raw, pulled_back, SignalBasis::Pullback)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testutil::*;

    fn strategy() -> MaPullbackStrategy {
        MaPullbackStrategy::new(PullbackParams::default())
    }

    #[test]
    fn gentle_uptrend_hugs_fast_ma() {
        let series = series_from_closes(&linear(1.0, 0.0002, 300));
        let result = strategy().analyze(&all_timeframes(&series));
        for r in &result.readings {
            assert_eq!(r.pattern, Pattern::PullbackFast);
            assert_eq!(r.strength, 90);
            assert_eq!(r.direction, 1);
        }
        assert!(result.event_detected);
        assert_eq!(result.score, 4);
        assert_eq!(result.overall.to_string(), "STRONG BUY (PULLBACK)");
    }

    #[test]
    fn drop_to_medium_ma() {
        let mut closes = linear(1.0, 0.001, 300);
        let n = closes.len();
        // Replace the last close with the mean of the 49 before it, which is
        // exactly where the 50-bar SMA lands.
        let c = closes[n - 50..n - 1].iter().sum::<f64>() / 49.0;
        closes[n - 1] = c;

        let result = strategy().analyze(&SeriesByTimeframe::new().with(Timeframe::H4, series_from_closes(&closes)));
        let h4 = result.reading(Timeframe::H4).unwrap();
        assert_eq!(h4.pattern, Pattern::PullbackMedium);
        assert_eq!(h4.strength, 80);
        assert!((result.raw_score - 0.8).abs() < 1e-12);
        assert_eq!(result.overall, Verdict::NEUTRAL);
    }

    #[test]
    fn aligned_but_extended_contributes_nothing() {
        let result = strategy().analyze(&all_timeframes(&rising(300)));
        for r in &result.readings {
            assert!(r.available);
            assert_eq!(r.direction, 0);
            assert_eq!(r.contribution, 0.0);
        }
        assert!(!result.event_detected);
        assert_eq!(result.overall, Verdict::NEUTRAL);
    }

    #[test]
    fn gentle_downtrend_is_sell_pullback() {
        let series = series_from_closes(&linear(2.0, -0.0002, 300));
        let result = strategy().analyze(&all_timeframes(&series));
        assert_eq!(result.score, -4);
        assert_eq!(result.overall.to_string(), "STRONG SELL (PULLBACK)");
    }

    #[test]
    fn classify_respects_established_trend() {
        let s = strategy();
        assert_eq!(s.classify(1.0, 1.001, 0.9, 0.8, 5), Some((90, Pattern::PullbackFast)));
        assert_eq!(s.classify(1.0, 1.001, 0.9, 0.8, 4), Some((80, Pattern::PullbackFast)));
        assert_eq!(s.classify(1.0, 1.1, 1.001, 0.8, 3), Some((70, Pattern::PullbackMedium)));
        assert_eq!(s.classify(1.0, 1.2, 1.1, 1.0025, 3), Some((60, Pattern::PullbackSlow)));
        assert_eq!(s.classify(1.0, 1.2, 1.1, 1.01, 9), None);
    }

    #[test]
    fn too_short_for_alignment_count() {
        let result = strategy().analyze(&all_timeframes(&rising(202)));
        assert!(result.readings.iter().all(|r| !r.available));
    }
}
