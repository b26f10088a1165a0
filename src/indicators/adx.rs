// =============================================================================
// Average Directional Index (ADX) — rolling-mean form
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation pipeline:
//   1. +DM = max(high - prevHigh, 0),  -DM = max(prevLow - low, 0)
//   2. TR per bar (see `atr::true_range_series`).
//   3. Rolling mean over `period` of TR, +DM and -DM.
//   4. +DI = mean(+DM) / mean(TR) * 100,  -DI = mean(-DM) / mean(TR) * 100
//   5. DX  = |+DI - -DI| / (+DI + -DI) * 100
//   6. ADX = rolling mean of DX over `period`.
//
// A zero TR mean or a zero DI sum carries no directional information and
// yields DX = 0 rather than a division fault.
//
// Interpretation:
//   ADX >= 25  => strong trend
//   ADX >= 20  => moderate trend
//   below      => weak / ranging
// =============================================================================

use crate::market_data::Candle;

use super::atr::true_range_series;
use super::{last_value, rolling_mean};

/// ADX aligned with `candles`. The first defined value sits at index
/// `2 * period - 1`.
pub fn adx_series(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let n = candles.len();
    if period == 0 || n < period + 1 {
        return vec![None; n];
    }

    // ------------------------------------------------------------------
    // Step 1 & 2: raw directional movement and true range
    // ------------------------------------------------------------------
    let mut plus_dm: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut minus_dm: Vec<Option<f64>> = Vec::with_capacity(n);
    plus_dm.push(None);
    minus_dm.push(None);
    for i in 1..n {
        let up_move = candles[i].high - candles[i - 1].high;
        let down_move = candles[i - 1].low - candles[i].low;
        plus_dm.push(Some(up_move.max(0.0)).filter(|v| v.is_finite()));
        minus_dm.push(Some(down_move.max(0.0)).filter(|v| v.is_finite()));
    }
    let tr: Vec<Option<f64>> = true_range_series(candles).into_iter().map(Some).collect();

    // ------------------------------------------------------------------
    // Step 3-5: smoothed DI and DX
    // ------------------------------------------------------------------
    let tr_mean = rolling_mean(&tr, period);
    let plus_mean = rolling_mean(&plus_dm, period);
    let minus_mean = rolling_mean(&minus_dm, period);

    let dx: Vec<Option<f64>> = (0..n)
        .map(|i| match (tr_mean[i], plus_mean[i], minus_mean[i]) {
            (Some(atr), Some(pdm), Some(mdm)) => Some(compute_dx(atr, pdm, mdm)),
            _ => None,
        })
        .collect();

    // ------------------------------------------------------------------
    // Step 6: ADX = rolling mean of DX
    // ------------------------------------------------------------------
    rolling_mean(&dx, period)
}

/// Compute the most recent ADX value from a slice of OHLC candles.
///
/// Returns `None` when:
/// - `period` is zero.
/// - There are fewer than `period + 1` candles.
/// - The DX history is still shorter than `period` at the last bar.
pub fn calculate_adx(candles: &[Candle], period: usize) -> Option<f64> {
    last_value(&adx_series(candles, period))
}

/// DX from rolling means of TR, +DM and -DM.
fn compute_dx(tr_mean: f64, plus_dm_mean: f64, minus_dm_mean: f64) -> f64 {
    if tr_mean <= 0.0 {
        return 0.0;
    }

    let plus_di = (plus_dm_mean / tr_mean) * 100.0;
    let minus_di = (minus_dm_mean / tr_mean) * 100.0;

    let di_sum = plus_di + minus_di;
    if di_sum <= 0.0 {
        // Both +DI and -DI are zero: no directional movement.
        return 0.0;
    }

    let dx = ((plus_di - minus_di).abs() / di_sum) * 100.0;
    if dx.is_finite() {
        dx
    } else {
        0.0
    }
}
