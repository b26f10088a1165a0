// =============================================================================
// SMMA Trend-Alignment Strategy
// =============================================================================
//
// Per timeframe, the 20/50/200 smoothed moving averages of the close:
//   fast > medium > slow  => +1
//   fast < medium < slow  => -1
//   otherwise             =>  0 (mixed)
//
// Each timeframe also carries an ADX strength label.  The score is the plain
// sum of the five trend values:
//   >= 4 STRONG BUY, >= 3 BUY, <= -4 STRONG SELL, <= -3 SELL, else NEUTRAL.
// The overall strength is the share of ADX-rated timeframes that are STRONG
// (>= 60% STRONG, >= 30% MODERATE, else WEAK).

use tracing::debug;

use crate::indicators::adx::calculate_adx;
use crate::indicators::smma::calculate_smma;
use crate::market_data::{Series, SeriesByTimeframe};
use crate::runtime_config::{AdxParams, SmmaParams};
use crate::types::{AdxStrength, Timeframe};

use super::{
    Pattern, Signal, Strategy, StrategyKind, StrategyResult, TimeframeReading, Verdict,
};

pub struct SmmaTrendStrategy {
    params: SmmaParams,
    adx: AdxParams,
}

impl SmmaTrendStrategy {
    pub fn new(params: SmmaParams, adx: AdxParams) -> Self {
        Self { params, adx }
    }

    fn read_timeframe(&self, timeframe: Timeframe, series: Option<&Series>) -> TimeframeReading {
        let Some(series) = series else {
            return TimeframeReading::unavailable(timeframe);
        };
        if series.len() < self.params.slow {
            debug!(
                %timeframe,
                bars = series.len(),
                needed = self.params.slow,
                "SMMA trend: insufficient data"
            );
            return TimeframeReading::unavailable(timeframe);
        }

        let closes = series.closes();
        let (Some(fast), Some(medium), Some(slow)) = (
            calculate_smma(&closes, self.params.fast),
            calculate_smma(&closes, self.params.medium),
            calculate_smma(&closes, self.params.slow),
        ) else {
            return TimeframeReading::unavailable(timeframe);
        };

        let direction = if fast > medium && medium > slow {
            1
        } else if fast < medium && medium < slow {
            -1
        } else {
            0
        };

        let adx_value = if self.params.use_adx {
            calculate_adx(series.candles(), self.adx.period)
        } else {
            None
        };
        let adx = AdxStrength::classify(adx_value, self.adx.strong, self.adx.weak);

        debug!(
            %timeframe,
            fast,
            medium,
            slow,
            direction,
            adx = ?adx_value,
            "SMMA trend reading"
        );

        TimeframeReading {
            timeframe,
            available: true,
            direction,
            strength: if direction == 0 { 0 } else { 100 },
            contribution: f64::from(direction),
            pattern: if direction == 0 {
                Pattern::None
            } else {
                Pattern::Trend
            },
            adx,
            adx_value,
        }
    }
}

impl Strategy for SmmaTrendStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SmmaTrend
    }

    fn analyze(&self, series: &SeriesByTimeframe) -> StrategyResult {
        let readings: Vec<TimeframeReading> = Timeframe::ALL
            .iter()
            .map(|&tf| self.read_timeframe(tf, series.get(tf)))
            .collect();

        let strength = overall_strength(&readings);
        let mut result =
            StrategyResult::from_readings(StrategyKind::SmmaTrend, readings, |raw, _| {
                trend_verdict(raw.trunc() as i32)
            });
        result.strength = strength;
        result
    }
}

fn trend_verdict(score: i32) -> Verdict {
    let signal = match score {
        s if s >= 4 => Signal::StrongBuy,
        3 => Signal::Buy,
        s if s <= -4 => Signal::StrongSell,
        -3 => Signal::Sell,
        _ => Signal::Neutral,
    };
    Verdict::Signal {
        signal,
        basis: None,
    }
}

fn overall_strength(readings: &[TimeframeReading]) -> AdxStrength {
    let rated: Vec<AdxStrength> = readings
        .iter()
        .map(|r| r.adx)
        .filter(|a| *a != AdxStrength::NotAvailable)
        .collect();
    if rated.is_empty() {
        return AdxStrength::NotAvailable;
    }

    let strong = rated.iter().filter(|a| **a == AdxStrength::Strong).count() as f64;
    let total = rated.len() as f64;
    if strong >= total * 0.6 {
        AdxStrength::Strong
    } else if strong >= total * 0.3 {
        AdxStrength::Moderate
    } else {
        AdxStrength::Weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testutil::*;

    fn strategy() -> SmmaTrendStrategy {
        SmmaTrendStrategy::new(SmmaParams::default(), AdxParams::default())
    }

    #[test]
    fn all_timeframes_rising_is_strong_buy() {
        let result = strategy().analyze(&all_timeframes(&rising(300)));
        assert_eq!(result.score, 5);
        assert_eq!(result.overall.to_string(), "STRONG BUY");
        for tf in Timeframe::ALL {
            assert_eq!(result.direction(tf), 1);
            assert_eq!(result.adx(tf), AdxStrength::Strong);
        }
        assert_eq!(result.strength, AdxStrength::Strong);
    }

    #[test]
    fn falling_is_strong_sell() {
        let result = strategy().analyze(&all_timeframes(&falling(300)));
        assert_eq!(result.score, -5);
        assert_eq!(result.overall.to_string(), "STRONG SELL");
    }

    #[test]
    fn short_series_is_unavailable_and_neutral() {
        let result = strategy().analyze(&all_timeframes(&rising(150)));
        assert_eq!(result.score, 0);
        assert_eq!(result.overall, Verdict::NEUTRAL);
        assert!(result.readings.iter().all(|r| !r.available));
        assert_eq!(result.strength, AdxStrength::NotAvailable);
    }

    #[test]
    fn missing_timeframes_contribute_zero() {
        let series = SeriesByTimeframe::new()
            .with(Timeframe::M15, rising(300))
            .with(Timeframe::H1, rising(300))
            .with(Timeframe::H4, rising(300));
        let result = strategy().analyze(&series);
        assert_eq!(result.score, 3);
        assert_eq!(result.overall.to_string(), "BUY");
        assert_eq!(result.adx(Timeframe::D), AdxStrength::NotAvailable);
        assert!(!result.reading(Timeframe::M5).unwrap().available);
    }

    #[test]
    fn adx_labels_can_be_disabled() {
        let params = SmmaParams {
            use_adx: false,
            ..SmmaParams::default()
        };
        let result =
            SmmaTrendStrategy::new(params, AdxParams::default()).analyze(&all_timeframes(&rising(300)));
        assert_eq!(result.score, 5);
        assert_eq!(result.strength, AdxStrength::NotAvailable);
    }

    #[test]
    fn strength_buckets() {
        let mut readings: Vec<TimeframeReading> = Timeframe::ALL
            .iter()
            .map(|&tf| TimeframeReading::unavailable(tf))
            .collect();
        readings[0].adx = AdxStrength::Strong;
        readings[1].adx = AdxStrength::Weak;
        readings[2].adx = AdxStrength::Weak;
        assert_eq!(overall_strength(&readings), AdxStrength::Moderate);
        readings[1].adx = AdxStrength::Strong;
        assert_eq!(overall_strength(&readings), AdxStrength::Strong);
        readings[0].adx = AdxStrength::Moderate;
        readings[1].adx = AdxStrength::Moderate;
        assert_eq!(overall_strength(&readings), AdxStrength::Weak);
    }
}
