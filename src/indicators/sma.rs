// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of the last `period` closes.  Used by the MA-cross and
// MA-pullback strategies, which both need the value on earlier bars as well as
// the latest one.
// =============================================================================

use super::rolling_mean;

/// SMA aligned with `closes`: index `i` holds the mean of
/// `closes[i + 1 - period ..= i]`, or `None` for the first `period - 1` bars.
///
/// Returns all-`None` when `period` is zero or longer than the input.
pub fn sma_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let values: Vec<Option<f64>> = closes.iter().map(|c| Some(*c)).collect();
    rolling_mean(&values, period)
}
