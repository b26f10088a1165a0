// =============================================================================
// Technical Context — pivots, swing levels and price-action patterns
// =============================================================================
//
// Display context attached to every instrument analysis.  Nothing here feeds
// confidence or selection.
//
//   - Daily floor pivots (PP, R1-R3, S1-S3) from the last D bar
//   - H4/H1 support and resistance: 5-bar swing lows/highs, merged into
//     clusters when neighbours sit within `cluster_tolerance` of each other
//   - H4/H1 ATR and the pattern of the latest bar
//   - Every level flattened into one list, highest price first
// =============================================================================

use serde::Serialize;
use tracing::debug;

use crate::indicators::atr::calculate_atr;
use crate::market_data::{Candle, SeriesByTimeframe};
use crate::runtime_config::TechnicalParams;
use crate::types::Timeframe;

/// Bars a pattern check needs before it looks at the latest two.
const PATTERN_MIN_BARS: usize = 10;

fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

// =============================================================================
// Types
// =============================================================================

/// Classic floor pivots, rounded to five decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PivotPoints {
    pub pp: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

/// Clustered swing levels. Support ascending, resistance descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupportResistance {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceAction {
    #[default]
    None,
    BullishEngulfing,
    BearishEngulfing,
    Doji,
    BullishPin,
    BearishPin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LevelKind {
    PivotPp,
    PivotR1,
    PivotR2,
    PivotR3,
    PivotS1,
    PivotS2,
    PivotS3,
    Support,
    Resistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeyLevel {
    pub kind: LevelKind,
    pub price: f64,
    pub timeframe: Timeframe,
}

/// Technical context for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TechnicalAnalysis {
    pub daily_pivots: Option<PivotPoints>,
    pub h4_levels: Option<SupportResistance>,
    pub h1_levels: Option<SupportResistance>,
    pub atr_h4: Option<f64>,
    pub atr_h1: Option<f64>,
    pub pattern_h4: PriceAction,
    pub pattern_h1: PriceAction,
    /// Every pivot and swing level, highest price first.
    pub key_levels: Vec<KeyLevel>,
}

// =============================================================================
// Calculations
// =============================================================================

/// Floor pivots from the last bar. `None` on an empty slice.
pub fn pivot_points(candles: &[Candle]) -> Option<PivotPoints> {
    let last = candles.last()?;
    let (high, low, close) = (last.high, last.low, last.close);
    let pp = (high + low + close) / 3.0;

    Some(PivotPoints {
        pp: round5(pp),
        r1: round5(2.0 * pp - low),
        r2: round5(pp + (high - low)),
        r3: round5(high + 2.0 * (pp - low)),
        s1: round5(2.0 * pp - high),
        s2: round5(pp - (high - low)),
        s3: round5(low - 2.0 * (high - pp)),
    })
}

/// Merge sorted levels whose distance to the previous member of the running
/// cluster is within `tolerance` (relative). Returns cluster means, rounded.
fn cluster_levels(mut levels: Vec<f64>, tolerance: f64) -> Vec<f64> {
    levels.sort_by(f64::total_cmp);

    let mut clusters = Vec::new();
    let mut current: Vec<f64> = Vec::new();
    for level in levels {
        if let Some(&prev) = current.last() {
            if (level - prev).abs() > tolerance * prev.abs() {
                clusters.push(round5(current.iter().sum::<f64>() / current.len() as f64));
                current.clear();
            }
        }
        current.push(level);
    }
    if !current.is_empty() {
        clusters.push(round5(current.iter().sum::<f64>() / current.len() as f64));
    }
    clusters
}

/// Swing-based support and resistance. A bar is a swing high (low) when its
/// high (low) is strictly beyond the two bars on each side.  Empty when the
/// series is shorter than `sr_lookback`.
pub fn support_resistance(candles: &[Candle], params: &TechnicalParams) -> SupportResistance {
    if candles.len() < params.sr_lookback.max(5) {
        return SupportResistance::default();
    }

    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for window in candles.windows(5) {
        let mid = &window[2];
        let others = [&window[0], &window[1], &window[3], &window[4]];
        if others.iter().all(|c| mid.high > c.high) {
            highs.push(mid.high);
        }
        if others.iter().all(|c| mid.low < c.low) {
            lows.push(mid.low);
        }
    }

    // Highest clusters on each side.
    let top = |levels: Vec<f64>| {
        let clusters = cluster_levels(levels, params.cluster_tolerance);
        let skip = clusters.len().saturating_sub(params.max_levels);
        clusters.into_iter().skip(skip).collect::<Vec<_>>()
    };

    let support = top(lows);
    let mut resistance = top(highs);
    resistance.reverse();

    SupportResistance { support, resistance }
}

/// Pattern of the latest bar, checked in order: engulfing, doji, pin bar.
pub fn price_action(candles: &[Candle]) -> PriceAction {
    if candles.len() < PATTERN_MIN_BARS {
        return PriceAction::None;
    }
    let prev = &candles[candles.len() - 2];
    let curr = &candles[candles.len() - 1];

    let prev_body = (prev.close - prev.open).abs();
    let body = (curr.close - curr.open).abs();

    if body > prev_body * 1.5 {
        if prev.close < prev.open && curr.close > curr.open {
            return PriceAction::BullishEngulfing;
        }
        if prev.close > prev.open && curr.close < curr.open {
            return PriceAction::BearishEngulfing;
        }
    }

    if body < (curr.high - curr.low) * 0.1 {
        return PriceAction::Doji;
    }

    let upper_wick = curr.high - curr.close.max(curr.open);
    let lower_wick = curr.close.min(curr.open) - curr.low;
    if upper_wick > body * 2.0 && lower_wick < body * 0.5 {
        return PriceAction::BearishPin;
    }
    if lower_wick > body * 2.0 && upper_wick < body * 0.5 {
        return PriceAction::BullishPin;
    }

    PriceAction::None
}

// =============================================================================
// Analyzer
// =============================================================================

pub struct TechnicalAnalyzer {
    params: TechnicalParams,
}

impl TechnicalAnalyzer {
    pub fn new(params: TechnicalParams) -> Self {
        Self { params }
    }

    pub fn analyze(&self, series: &SeriesByTimeframe) -> TechnicalAnalysis {
        let mut out = TechnicalAnalysis {
            daily_pivots: series
                .get(Timeframe::D)
                .and_then(|s| pivot_points(s.candles())),
            ..TechnicalAnalysis::default()
        };

        if let Some(h4) = series.get(Timeframe::H4) {
            out.h4_levels = Some(support_resistance(h4.candles(), &self.params));
            out.atr_h4 = calculate_atr(h4.candles(), self.params.atr_period);
            out.pattern_h4 = price_action(h4.candles());
        }
        if let Some(h1) = series.get(Timeframe::H1) {
            out.h1_levels = Some(support_resistance(h1.candles(), &self.params));
            out.atr_h1 = calculate_atr(h1.candles(), self.params.atr_period);
            out.pattern_h1 = price_action(h1.candles());
        }

        out.key_levels = key_levels(&out);
        debug!(
            levels = out.key_levels.len(),
            pattern_h4 = ?out.pattern_h4,
            pattern_h1 = ?out.pattern_h1,
            "technical context built"
        );
        out
    }
}

fn key_levels(analysis: &TechnicalAnalysis) -> Vec<KeyLevel> {
    let mut levels = Vec::new();

    if let Some(p) = analysis.daily_pivots {
        let pivots = [
            (LevelKind::PivotPp, p.pp),
            (LevelKind::PivotR1, p.r1),
            (LevelKind::PivotR2, p.r2),
            (LevelKind::PivotR3, p.r3),
            (LevelKind::PivotS1, p.s1),
            (LevelKind::PivotS2, p.s2),
            (LevelKind::PivotS3, p.s3),
        ];
        levels.extend(pivots.into_iter().map(|(kind, price)| KeyLevel {
            kind,
            price,
            timeframe: Timeframe::D,
        }));
    }

    for (timeframe, sr) in [
        (Timeframe::H4, &analysis.h4_levels),
        (Timeframe::H1, &analysis.h1_levels),
    ] {
        let Some(sr) = sr else { continue };
        for &price in &sr.support {
            levels.push(KeyLevel { kind: LevelKind::Support, price, timeframe });
        }
        for &price in &sr.resistance {
            levels.push(KeyLevel { kind: LevelKind::Resistance, price, timeframe });
        }
    }

    // Stable: equal prices keep insertion order.
    levels.sort_by(|a, b| b.price.total_cmp(&a.price));
    levels
}
