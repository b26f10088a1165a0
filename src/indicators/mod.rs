// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the strategies are
// built on.  Series functions return one `Option<f64>` per input bar, aligned
// with the input, so callers can look back at earlier values; `None` marks a
// bar where the indicator is not yet defined.  Scalar helpers return the most
// recent defined value, or `None` on insufficient data.

pub mod adx;
pub mod atr;
pub mod sma;
pub mod smma;

/// Most recent value of an aligned indicator series.
pub fn last_value(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

/// Value `bars_back` bars before the last one (0 = last).
pub fn value_back(series: &[Option<f64>], bars_back: usize) -> Option<f64> {
    let idx = series.len().checked_sub(1 + bars_back)?;
    series[idx]
}

/// Mean of every window of `period` values ending at each index. A window that
/// contains an undefined value is itself undefined.
pub(crate) fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let period_f = period as f64;
    for end in (period - 1)..values.len() {
        let window = &values[end + 1 - period..=end];
        let mut sum = 0.0;
        let mut complete = true;
        for v in window {
            match v {
                Some(x) if x.is_finite() => sum += x,
                _ => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            out[end] = Some(sum / period_f);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_skips_incomplete_windows() {
        let values = vec![None, Some(1.0), Some(2.0), Some(3.0)];
        let out = rolling_mean(&values, 2);
        assert_eq!(out, vec![None, None, Some(1.5), Some(2.5)]);
    }

    #[test]
    fn value_back_indexes_from_the_end() {
        let series = vec![Some(1.0), None, Some(3.0)];
        assert_eq!(value_back(&series, 0), Some(3.0));
        assert_eq!(value_back(&series, 1), None);
        assert_eq!(value_back(&series, 2), Some(1.0));
        assert_eq!(value_back(&series, 3), None);
        assert_eq!(last_value(&[]), None);
    }
}
