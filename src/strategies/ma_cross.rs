// =============================================================================
// Moving-Average Crossover Strategy
// =============================================================================
//
// Simple moving averages fast(20) / slow(50) / confirm(200) per timeframe.
//
// A crossover between the last two bars is GOLDEN (fast moves above slow) or
// DEATH (fast moves below slow), provided the bars end at least
// `min_separation` apart.  Its strength reflects agreement with the confirm
// MA:
//   90  price and fast MA both on the favourable side of confirm
//   70  only price on the favourable side
//   50  counter-trend
//
// Without a crossover, an ongoing alignment still contributes:
//   80  fast > slow > confirm (or the bearish mirror)
//   60  fast beyond both slow and confirm while slow has not cleared confirm
//
// Contribution = direction * strength / 100.

use tracing::debug;

use crate::indicators::sma::sma_series;
use crate::indicators::{last_value, value_back};
use crate::market_data::{Series, SeriesByTimeframe};
use crate::runtime_config::MaCrossParams;
use crate::types::Timeframe;

use super::{
    Pattern, SignalBasis, Strategy, StrategyKind, StrategyResult, TimeframeReading, Verdict,
};

pub struct MaCrossStrategy {
    params: MaCrossParams,
}

/// MA values at the last two bars of one timeframe.
#[derive(Debug, Clone, Copy)]
struct CrossInputs {
    price: f64,
    fast: f64,
    fast_prev: f64,
    slow: f64,
    slow_prev: f64,
    confirm: f64,
}

impl MaCrossStrategy {
    pub fn new(params: MaCrossParams) -> Self {
        Self { params }
    }

    fn inputs(&self, series: &Series) -> Option<CrossInputs> {
        if series.len() < self.params.confirm {
            return None;
        }
        let closes = series.closes();
        let fast = sma_series(&closes, self.params.fast);
        let slow = sma_series(&closes, self.params.slow);
        let confirm = sma_series(&closes, self.params.confirm);

        Some(CrossInputs {
            price: *closes.last()?,
            fast: last_value(&fast)?,
            fast_prev: value_back(&fast, 1)?,
            slow: last_value(&slow)?,
            slow_prev: value_back(&slow, 1)?,
            confirm: last_value(&confirm)?,
        })
    }

    fn read_timeframe(&self, timeframe: Timeframe, series: Option<&Series>) -> TimeframeReading {
        let Some(inputs) = series.and_then(|s| self.inputs(s)) else {
            return TimeframeReading::unavailable(timeframe);
        };

        let reading = match self.detect_cross(&inputs) {
            Some((direction, strength, pattern)) => {
                TimeframeReading::weighted(timeframe, direction, strength, pattern)
            }
            None => {
                let (direction, strength) = ongoing_alignment(&inputs);
                let pattern = if direction == 0 {
                    Pattern::None
                } else {
                    Pattern::Aligned
                };
                TimeframeReading::weighted(timeframe, direction, strength, pattern)
            }
        };

        debug!(
            %timeframe,
            fast = inputs.fast,
            slow = inputs.slow,
            confirm = inputs.confirm,
            pattern = ?reading.pattern,
            strength = reading.strength,
            "MA cross reading"
        );
        reading
    }

    fn detect_cross(&self, m: &CrossInputs) -> Option<(i8, u8, Pattern)> {
        let separated = (m.fast - m.slow).abs() >= self.params.min_separation;

        if m.fast_prev <= m.slow_prev && m.fast > m.slow {
            if !separated {
                return None;
            }
            let strength = if m.price > m.confirm && m.fast > m.confirm {
                90
            } else if m.price > m.confirm {
                70
            } else {
                50
            };
            return Some((1, strength, Pattern::GoldenCross));
        }

        if m.fast_prev >= m.slow_prev && m.fast < m.slow {
            if !separated {
                return None;
            }
            let strength = if m.price < m.confirm && m.fast < m.confirm {
                90
            } else if m.price < m.confirm {
                70
            } else {
                50
            };
            return Some((-1, strength, Pattern::DeathCross));
        }

        None
    }
}

fn ongoing_alignment(m: &CrossInputs) -> (i8, u8) {
    if m.fast > m.slow && m.slow > m.confirm {
        (1, 80)
    } else if m.fast < m.slow && m.slow < m.confirm {
        (-1, 80)
    } else if m.fast > m.slow && m.fast > m.confirm {
        (1, 60)
    } else if m.fast < m.slow && m.fast < m.confirm {
        (-1, 60)
    } else {
        (0, 0)
    }
}

impl Strategy for MaCrossStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MaCross
    }

    fn analyze(&self, series: &SeriesByTimeframe) -> StrategyResult {
        let readings = Timeframe::ALL
            .iter()
            .map(|&tf| self.read_timeframe(tf, series.get(tf)))
            .collect();
        StrategyResult::from_readings(StrategyKind::MaCross, readings, |raw, crossed| {
            Verdict::weighted(raw, crossed, SignalBasis::Cross)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testutil::*;

    fn strategy() -> MaCrossStrategy {
        MaCrossStrategy::new(MaCrossParams::default())
    }

    /// Long uptrend, a dip that drags fast below slow, then a rebound cut off
    /// at the bar where fast crosses back above slow.
    fn golden_cross_closes() -> Vec<f64> {
        let mut closes = linear(1.0, 0.001, 300);
        let top = *closes.last().unwrap();
        closes.extend((1..=30).map(|i| top - 0.002 * i as f64));
        let bottom = *closes.last().unwrap();
        closes.extend((1..=60).map(|i| bottom + 0.003 * i as f64));

        let fast = sma_series(&closes, 20);
        let slow = sma_series(&closes, 50);
        let cross = (301..closes.len())
            .find(|&i| {
                let (f0, s0, f1, s1) = (fast[i - 1].unwrap(), slow[i - 1].unwrap(), fast[i].unwrap(), slow[i].unwrap());
                f0 <= s0 && f1 > s1
            })
            .expect("rebound crosses");
        closes.truncate(cross + 1);
        closes
    }

    #[test]
    fn golden_cross_with_trend_confirmation() {
        let series = SeriesByTimeframe::new().with(Timeframe::H1, series_from_closes(&golden_cross_closes()));
        let result = strategy().analyze(&series);
        let h1 = result.reading(Timeframe::H1).unwrap();
        assert_eq!(h1.pattern, Pattern::GoldenCross);
        assert_eq!(h1.strength, 90);
        assert_eq!(h1.direction, 1);
        assert!(result.event_detected);
        // 0.9 alone stays below the BUY threshold
        assert_eq!(result.overall, Verdict::NEUTRAL);
    }

    #[test]
    fn cross_plus_aligned_timeframes_is_strong_buy_cross() {
        let series = all_timeframes(&rising(300)).with(Timeframe::H1, series_from_closes(&golden_cross_closes()));
        let result = strategy().analyze(&series);
        assert!((result.raw_score - 4.1).abs() < 1e-9);
        assert_eq!(result.score, 4);
        assert_eq!(result.overall.to_string(), "STRONG BUY (CROSS)");
    }

    #[test]
    fn aligned_uptrend_is_trend_verdict() {
        let result = strategy().analyze(&all_timeframes(&rising(300)));
        for r in &result.readings {
            assert_eq!(r.pattern, Pattern::Aligned);
            assert_eq!(r.strength, 80);
        }
        assert!(!result.event_detected);
        assert_eq!(result.score, 4);
        assert_eq!(result.overall.to_string(), "STRONG BUY (TREND)");
    }

    #[test]
    fn downtrend_is_sell_trend() {
        let result = strategy().analyze(&all_timeframes(&falling(300)));
        assert_eq!(result.score, -4);
        assert_eq!(result.overall.to_string(), "STRONG SELL (TREND)");
    }

    #[test]
    fn min_separation_suppresses_cross() {
        let params = MaCrossParams {
            min_separation: 1.0,
            ..MaCrossParams::default()
        };
        let series = SeriesByTimeframe::new().with(Timeframe::H1, series_from_closes(&golden_cross_closes()));
        let result = MaCrossStrategy::new(params).analyze(&series);
        assert!(!result.event_detected);
        assert_ne!(result.reading(Timeframe::H1).unwrap().pattern, Pattern::GoldenCross);
    }

    #[test]
    fn partial_alignment_strength() {
        let m = CrossInputs {
            price: 1.0,
            fast: 1.3,
            fast_prev: 1.3,
            slow: 1.1,
            slow_prev: 1.1,
            confirm: 1.2,
        };
        assert_eq!(ongoing_alignment(&m), (1, 60));
        let m = CrossInputs {
            fast: 0.9,
            fast_prev: 0.9,
            slow: 1.3,
            slow_prev: 1.3,
            ..m
        };
        assert_eq!(ongoing_alignment(&m), (-1, 60));
    }

    #[test]
    fn short_series_is_unavailable() {
        let result = strategy().analyze(&all_timeframes(&rising(199)));
        assert!(result.readings.iter().all(|r| !r.available));
        assert_eq!(result.overall, Verdict::NEUTRAL);
    }
}
