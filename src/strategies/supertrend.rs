// =============================================================================
// Supertrend Strategy (display context only)
// =============================================================================
//
// Bands sit `multiplier * ATR` above and below the bar midpoint (H+L)/2.
// Walking forward from direction +1:
//   close > previous upper band  => +1
//   close < previous lower band  => -1
//   otherwise hold, and let the band on the held side only tighten toward
//   price (lower band never falls in an uptrend, upper never rises in a
//   downtrend).
//
// Score = sum of the final directions over the five timeframes:
//   >= 5 STRONG UP, >= 3 UP, <= -5 STRONG DOWN, <= -3 DOWN, else MIXED.
// The result is exposed for display and never enters confidence scoring or
// strategy selection.

use crate::indicators::atr::atr_series;
use crate::market_data::{Candle, SeriesByTimeframe};
use crate::runtime_config::SupertrendParams;
use crate::types::Timeframe;

use super::{
    Pattern, Strategy, StrategyKind, StrategyResult, TimeframeReading, TrendBias, Verdict,
};

pub struct SupertrendStrategy {
    params: SupertrendParams,
}

impl SupertrendStrategy {
    pub fn new(params: SupertrendParams) -> Self {
        Self { params }
    }

    /// Final direction over `candles`, or `None` with fewer than
    /// `atr_period + 1` bars.
    pub fn direction(&self, candles: &[Candle]) -> Option<i8> {
        if candles.len() < self.params.atr_period + 1 {
            return None;
        }

        let atr = atr_series(candles, self.params.atr_period);
        let mut upper: Vec<Option<f64>> = Vec::with_capacity(candles.len());
        let mut lower: Vec<Option<f64>> = Vec::with_capacity(candles.len());
        for (c, a) in candles.iter().zip(&atr) {
            let mid = (c.high + c.low) / 2.0;
            upper.push(a.map(|a| mid + self.params.multiplier * a));
            lower.push(a.map(|a| mid - self.params.multiplier * a));
        }

        let mut direction: i8 = 1;
        for i in 1..candles.len() {
            let close = candles[i].close;
            if upper[i - 1].is_some_and(|u| close > u) {
                direction = 1;
            } else if lower[i - 1].is_some_and(|l| close < l) {
                direction = -1;
            } else if direction == 1 {
                if let (Some(cur), Some(prev)) = (lower[i], lower[i - 1]) {
                    if cur < prev {
                        lower[i] = Some(prev);
                    }
                }
            } else if let (Some(cur), Some(prev)) = (upper[i], upper[i - 1]) {
                if cur > prev {
                    upper[i] = Some(prev);
                }
            }
        }

        Some(direction)
    }
}

impl Strategy for SupertrendStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Supertrend
    }

    fn analyze(&self, series: &SeriesByTimeframe) -> StrategyResult {
        let readings = Timeframe::ALL
            .iter()
            .map(|&tf| {
                match series.get(tf).and_then(|s| self.direction(s.candles())) {
                    Some(direction) => {
                        TimeframeReading::weighted(tf, direction, 100, Pattern::Band)
                    }
                    None => TimeframeReading::unavailable(tf),
                }
            })
            .collect();
        StrategyResult::from_readings(StrategyKind::Supertrend, readings, |raw, _| {
            Verdict::Trend(trend_bias(raw.trunc() as i32))
        })
    }
}

fn trend_bias(score: i32) -> TrendBias {
    match score {
        s if s >= 5 => TrendBias::StrongUp,
        s if s >= 3 => TrendBias::Up,
        s if s <= -5 => TrendBias::StrongDown,
        s if s <= -3 => TrendBias::Down,
        _ => TrendBias::Mixed,
    }
}
