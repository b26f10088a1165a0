// =============================================================================
// Confidence Scorer
// =============================================================================
//
// Blends one strategy's per-timeframe readings, the MA-cross / MA-pullback
// companion pair, the volatility regime and a historical win rate into a
// single 0-100 confidence.
//
// Sub-scores (default maxima):
//   timeframe alignment  40  core timeframes M15/H1/H4 agreeing
//   MA convergence       15  cross and pullback scores agreeing
//   trend strength       15  STRONG / MODERATE ADX labels on core timeframes
//   volatility           15  current ATR against its trailing mean
//   win rate             15  fixed per-strategy table
//
// Configured weights rescale each table linearly from its default maximum.

use serde::Serialize;
use tracing::debug;

use crate::indicators::atr::atr_ratio;
use crate::market_data::Series;
use crate::runtime_config::{ConfidenceParams, ConfidenceWeights};
use crate::strategies::StrategyResult;
use crate::types::{AdxStrength, Timeframe};

/// Points awarded by each sub-score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfidenceBreakdown {
    pub timeframe_alignment: u32,
    pub ma_convergence: u32,
    pub trend_strength: u32,
    pub volatility: u32,
    pub win_rate: u32,
}

impl ConfidenceBreakdown {
    pub fn total(&self) -> u32 {
        self.timeframe_alignment
            + self.ma_convergence
            + self.trend_strength
            + self.volatility
            + self.win_rate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfidenceResult {
    /// Always within [0, 100].
    pub confidence: u32,
    pub breakdown: ConfidenceBreakdown,
    pub meets_threshold: bool,
}

/// The MA-cross and MA-pullback results a strategy is compared against.
#[derive(Debug, Clone, Copy)]
pub struct Companions<'a> {
    pub ma_cross: Option<&'a StrategyResult>,
    pub ma_pullback: Option<&'a StrategyResult>,
}

pub struct ConfidenceScorer {
    params: ConfidenceParams,
}

impl ConfidenceScorer {
    pub fn new(params: ConfidenceParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ConfidenceParams {
        &self.params
    }

    /// Score `subject`.  `volatility_series` is the series named by
    /// `volatility_timeframe`, `None` when it was not fetched.
    pub fn score(
        &self,
        subject: &StrategyResult,
        companions: Companions<'_>,
        volatility_series: Option<&Series>,
    ) -> ConfidenceResult {
        let w = &self.params.weights;

        let breakdown = ConfidenceBreakdown {
            timeframe_alignment: scale(
                alignment_points(subject),
                w.timeframe_alignment,
                ConfidenceWeights::DEFAULT_ALIGNMENT,
            ),
            ma_convergence: scale(
                convergence_points(subject, companions),
                w.ma_convergence,
                ConfidenceWeights::DEFAULT_COMPONENT,
            ),
            trend_strength: scale(
                trend_strength_points(subject),
                w.trend_strength,
                ConfidenceWeights::DEFAULT_COMPONENT,
            ),
            volatility: scale(
                self.volatility_points(volatility_series),
                w.volatility,
                ConfidenceWeights::DEFAULT_COMPONENT,
            ),
            win_rate: self.win_rate_points(subject.strategy.key()),
        };

        let confidence = breakdown.total().min(100);
        debug!(
            strategy = subject.strategy.key(),
            confidence,
            alignment = breakdown.timeframe_alignment,
            convergence = breakdown.ma_convergence,
            trend_strength = breakdown.trend_strength,
            volatility = breakdown.volatility,
            win_rate = breakdown.win_rate,
            "confidence scored"
        );

        ConfidenceResult {
            confidence,
            breakdown,
            meets_threshold: confidence >= self.params.min_confidence,
        }
    }

    fn volatility_points(&self, series: Option<&Series>) -> u32 {
        let Some(series) = series else {
            return 8;
        };
        if series.len() < self.params.volatility_atr_period {
            return 5;
        }
        match atr_ratio(
            series.candles(),
            self.params.volatility_atr_period,
            self.params.volatility_lookback,
        ) {
            Some(ratio) => volatility_band(ratio),
            None => 5,
        }
    }

    /// Win rate (percent) times the sub-score weight, truncated.
    fn win_rate_points(&self, strategy_key: &str) -> u32 {
        let pct = self
            .params
            .win_rates
            .get(strategy_key)
            .copied()
            .unwrap_or(self.params.default_win_rate);
        pct * self.params.weights.win_rate / 100
    }
}

fn scale(points: u32, weight: u32, default_max: u32) -> u32 {
    if weight == default_max {
        return points;
    }
    points * weight / default_max
}

fn same_sign(values: &[i8]) -> bool {
    values.iter().all(|&v| v > 0) || values.iter().all(|&v| v < 0)
}

/// First match wins: all three core timeframes, then H1+H4, M15+H1, M15+H4.
fn alignment_points(result: &StrategyResult) -> u32 {
    let m15 = result.direction(Timeframe::M15);
    let h1 = result.direction(Timeframe::H1);
    let h4 = result.direction(Timeframe::H4);

    if same_sign(&[m15, h1, h4]) {
        40
    } else if same_sign(&[h1, h4]) {
        20
    } else if same_sign(&[m15, h1]) {
        15
    } else if same_sign(&[m15, h4]) {
        10
    } else {
        0
    }
}

fn convergence_points(subject: &StrategyResult, companions: Companions<'_>) -> u32 {
    let (Some(cross), Some(pullback)) = (companions.ma_cross, companions.ma_pullback) else {
        return (subject.score.unsigned_abs() * 3).min(15);
    };
    let c = cross.score;
    let p = pullback.score;

    if (c >= 3 && p >= 3) || (c <= -3 && p <= -3) {
        15
    } else if (c >= 1 && p >= 1) || (c <= -1 && p <= -1) {
        11
    } else if (c > 0 && p > 0) || (c < 0 && p < 0) {
        7
    } else if (c != 0) != (p != 0) {
        4
    } else {
        0
    }
}

fn trend_strength_points(result: &StrategyResult) -> u32 {
    let labels: Vec<AdxStrength> = Timeframe::CORE.iter().map(|&tf| result.adx(tf)).collect();
    let strong = labels.iter().filter(|&&a| a == AdxStrength::Strong).count();
    let moderate = labels.iter().filter(|&&a| a == AdxStrength::Moderate).count();

    match (strong, moderate) {
        (3, _) => 15,
        (2, _) => 12,
        (1, _) => 8,
        (_, m) if m >= 2 => 5,
        (_, 1) => 3,
        _ => 0,
    }
}

fn volatility_band(ratio: f64) -> u32 {
    if (1.0..=1.3).contains(&ratio) {
        15
    } else if (0.8..1.0).contains(&ratio) {
        12
    } else if ratio > 1.3 && ratio <= 1.5 {
        10
    } else if (0.6..0.8).contains(&ratio) {
        7
    } else if ratio > 1.5 && ratio <= 2.0 {
        5
    } else {
        2
    }
}
