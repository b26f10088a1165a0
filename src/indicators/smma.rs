// =============================================================================
// Smoothed Moving Average (SMMA / RMA)
// =============================================================================
//
// Wilder-style recursive low-pass filter on closing price.
//
// Formula:
//   SMMA_0 = SMA of the first `period` closes
//   SMMA_t = (SMMA_{t-1} * (period - 1) + close_t) / period
// =============================================================================

/// SMMA aligned with `closes`. The first defined value sits at index
/// `period - 1`.
///
/// Returns all-`None` when `period` is zero or the input is shorter than
/// `period` ("insufficient data").  A non-finite intermediate value ends the
/// series; later bars stay `None`.
pub fn smma_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period {
        return out;
    }

    let period_f = period as f64;
    let seed = closes[..period].iter().sum::<f64>() / period_f;
    if !seed.is_finite() {
        return out;
    }
    out[period - 1] = Some(seed);

    let mut prev = seed;
    for (i, &close) in closes.iter().enumerate().skip(period) {
        let next = (prev * (period_f - 1.0) + close) / period_f;
        if !next.is_finite() {
            break;
        }
        out[i] = Some(next);
        prev = next;
    }

    out
}

/// Latest SMMA value, or `None` on insufficient data.
pub fn calculate_smma(closes: &[f64], period: usize) -> Option<f64> {
    super::last_value(&smma_series(closes, period))
}
