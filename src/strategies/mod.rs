// =============================================================================
// Strategy Modules
// =============================================================================
//
// Four independent multi-timeframe analyzers behind one trait:
// - SMMA trend alignment (20/50/200 smoothed MAs, ADX-labelled)
// - Moving-average crossover (golden / death cross, 200-MA confirmation)
// - Moving-average pullback (aligned stack, price back at an MA)
// - Supertrend (ATR bands; display context only, never scored)
//
// Each takes the per-timeframe series of one instrument and returns a
// `StrategyResult` built entirely from that cycle's data.

pub mod ma_cross;
pub mod ma_pullback;
pub mod smma_trend;
pub mod supertrend;

pub use ma_cross::MaCrossStrategy;
pub use ma_pullback::MaPullbackStrategy;
pub use smma_trend::SmmaTrendStrategy;
pub use supertrend::SupertrendStrategy;

use serde::{Deserialize, Serialize};

use crate::market_data::SeriesByTimeframe;
use crate::types::{AdxStrength, Side, Timeframe};

// =============================================================================
// Strategy trait
// =============================================================================

/// A multi-timeframe directional analyzer.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Analyze every timeframe of one instrument. Missing or short series
    /// produce neutral, unavailable readings rather than errors.
    fn analyze(&self, series: &SeriesByTimeframe) -> StrategyResult;
}

/// Identity of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[serde(rename = "sma_trend")]
    SmmaTrend,
    MaCross,
    MaPullback,
    Supertrend,
}

impl StrategyKind {
    /// Key used by the win-rate table and the JSON API.
    pub fn key(self) -> &'static str {
        match self {
            Self::SmmaTrend => "sma_trend",
            Self::MaCross => "ma_cross",
            Self::MaPullback => "ma_pullback",
            Self::Supertrend => "supertrend",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SmmaTrend => write!(f, "SMA Trend"),
            Self::MaCross => write!(f, "MA Cross"),
            Self::MaPullback => write!(f, "MA Pullback"),
            Self::Supertrend => write!(f, "Supertrend"),
        }
    }
}

// =============================================================================
// Verdicts
// =============================================================================

/// Directional verdict of a scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

/// What drove a crossover / pullback verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalBasis {
    Cross,
    Pullback,
    Trend,
}

/// Supertrend's contextual verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendBias {
    StrongUp,
    Up,
    Mixed,
    Down,
    StrongDown,
}

/// The categorical `overall` verdict of a strategy. Serialises as its label,
/// e.g. `"STRONG BUY (CROSS)"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Verdict {
    Signal {
        signal: Signal,
        basis: Option<SignalBasis>,
    },
    Trend(TrendBias),
}

impl Verdict {
    pub const NEUTRAL: Verdict = Verdict::Signal {
        signal: Signal::Neutral,
        basis: None,
    };

    /// Normalised tradable direction. Neutral and supertrend verdicts have none.
    pub fn side(&self) -> Option<Side> {
        match self {
            Verdict::Signal { signal, .. } => match signal {
                Signal::StrongBuy | Signal::Buy => Some(Side::Buy),
                Signal::StrongSell | Signal::Sell => Some(Side::Sell),
                Signal::Neutral => None,
            },
            Verdict::Trend(_) => None,
        }
    }

    /// Verdict of the crossover and pullback strategies: STRONG at |score| >= 3,
    /// plain at |score| >= 1.5. A neutral verdict carries no basis suffix.
    pub fn weighted(raw_score: f64, event_detected: bool, event_basis: SignalBasis) -> Self {
        let signal = if raw_score >= 3.0 {
            Signal::StrongBuy
        } else if raw_score >= 1.5 {
            Signal::Buy
        } else if raw_score <= -3.0 {
            Signal::StrongSell
        } else if raw_score <= -1.5 {
            Signal::Sell
        } else {
            Signal::Neutral
        };

        if signal == Signal::Neutral {
            return Self::NEUTRAL;
        }

        let basis = if event_detected {
            event_basis
        } else {
            SignalBasis::Trend
        };
        Verdict::Signal {
            signal,
            basis: Some(basis),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Signal { signal, basis } => {
                let label = match signal {
                    Signal::StrongBuy => "STRONG BUY",
                    Signal::Buy => "BUY",
                    Signal::Neutral => "NEUTRAL",
                    Signal::Sell => "SELL",
                    Signal::StrongSell => "STRONG SELL",
                };
                f.write_str(label)?;
                match basis {
                    Some(SignalBasis::Cross) => f.write_str(" (CROSS)"),
                    Some(SignalBasis::Pullback) => f.write_str(" (PULLBACK)"),
                    Some(SignalBasis::Trend) => f.write_str(" (TREND)"),
                    None => Ok(()),
                }
            }
            Verdict::Trend(bias) => f.write_str(match bias {
                TrendBias::StrongUp => "STRONG UP",
                TrendBias::Up => "UP",
                TrendBias::Mixed => "MIXED",
                TrendBias::Down => "DOWN",
                TrendBias::StrongDown => "STRONG DOWN",
            }),
        }
    }
}

impl From<Verdict> for String {
    fn from(v: Verdict) -> Self {
        v.to_string()
    }
}

// =============================================================================
// Per-timeframe readings and the aggregate result
// =============================================================================

/// What a strategy saw on one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pattern {
    None,
    /// SMMA stack ordered one way.
    Trend,
    #[serde(rename = "GOLDEN")]
    GoldenCross,
    #[serde(rename = "DEATH")]
    DeathCross,
    /// No crossover this bar, MA stack ordered.
    Aligned,
    #[serde(rename = "TO_FAST_MA")]
    PullbackFast,
    #[serde(rename = "TO_MEDIUM_MA")]
    PullbackMedium,
    #[serde(rename = "TO_SLOW_MA")]
    PullbackSlow,
    /// Supertrend direction flag.
    Band,
}

/// One timeframe's contribution to a strategy result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeReading {
    pub timeframe: Timeframe,
    /// False when the series was absent or too short for the strategy.
    pub available: bool,
    /// -1, 0 or +1.
    pub direction: i8,
    /// 0-100 conviction; 100 for unweighted strategies when directional.
    pub strength: u8,
    /// Signed amount this timeframe adds to the raw score.
    pub contribution: f64,
    pub pattern: Pattern,
    pub adx: AdxStrength,
    pub adx_value: Option<f64>,
}

impl TimeframeReading {
    pub fn unavailable(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            available: false,
            direction: 0,
            strength: 0,
            contribution: 0.0,
            pattern: Pattern::None,
            adx: AdxStrength::NotAvailable,
            adx_value: None,
        }
    }

    /// A reading whose contribution is `direction * strength / 100`.
    pub fn weighted(timeframe: Timeframe, direction: i8, strength: u8, pattern: Pattern) -> Self {
        Self {
            timeframe,
            available: true,
            direction,
            strength,
            contribution: f64::from(direction) * f64::from(strength) / 100.0,
            pattern,
            adx: AdxStrength::NotAvailable,
            adx_value: None,
        }
    }
}

/// Aggregate output of one strategy for one instrument in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    pub strategy: StrategyKind,
    /// One reading per timeframe, finest first.
    pub readings: Vec<TimeframeReading>,
    /// Exact sum of the readings' contributions.
    pub raw_score: f64,
    /// `raw_score` truncated toward zero.
    pub score: i32,
    pub overall: Verdict,
    /// Share of ADX-rated timeframes that are STRONG, bucketed. N/A for
    /// strategies that do not rate ADX.
    pub strength: AdxStrength,
    /// A crossover or pullback fired on at least one timeframe.
    pub event_detected: bool,
}

impl StrategyResult {
    /// Sum the readings into a result; `overall` is derived by the caller.
    pub fn from_readings(
        strategy: StrategyKind,
        readings: Vec<TimeframeReading>,
        overall: impl FnOnce(f64, bool) -> Verdict,
    ) -> Self {
        let raw_score: f64 = readings.iter().map(|r| r.contribution).sum();
        let event_detected = readings.iter().any(|r| {
            matches!(
                r.pattern,
                Pattern::GoldenCross
                    | Pattern::DeathCross
                    | Pattern::PullbackFast
                    | Pattern::PullbackMedium
                    | Pattern::PullbackSlow
            )
        });
        let overall = overall(raw_score, event_detected);
        Self {
            strategy,
            readings,
            raw_score,
            score: raw_score.trunc() as i32,
            overall,
            strength: AdxStrength::NotAvailable,
            event_detected,
        }
    }

    pub fn reading(&self, timeframe: Timeframe) -> Option<&TimeframeReading> {
        self.readings.iter().find(|r| r.timeframe == timeframe)
    }

    /// Direction on `timeframe`, 0 when unavailable.
    pub fn direction(&self, timeframe: Timeframe) -> i8 {
        self.reading(timeframe).map_or(0, |r| r.direction)
    }

    /// ADX label on `timeframe`, N/A when unavailable.
    pub fn adx(&self, timeframe: Timeframe) -> AdxStrength {
        self.reading(timeframe).map_or(AdxStrength::NotAvailable, |r| r.adx)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_labels() {
        let v = Verdict::Signal {
            signal: Signal::StrongBuy,
            basis: Some(SignalBasis::Cross),
        };
        assert_eq!(v.to_string(), "STRONG BUY (CROSS)");
        assert_eq!(Verdict::NEUTRAL.to_string(), "NEUTRAL");
        assert_eq!(Verdict::Trend(TrendBias::StrongDown).to_string(), "STRONG DOWN");
    }

    #[test]
    fn verdict_serialises_as_label() {
        let v = Verdict::Signal {
            signal: Signal::Sell,
            basis: Some(SignalBasis::Pullback),
        };
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"SELL (PULLBACK)\"");
    }

    #[test]
    fn weighted_verdict_thresholds() {
        assert_eq!(Verdict::weighted(3.0, true, SignalBasis::Cross).to_string(), "STRONG BUY (CROSS)");
        assert_eq!(Verdict::weighted(1.5, false, SignalBasis::Cross).to_string(), "BUY (TREND)");
        assert_eq!(Verdict::weighted(1.49, true, SignalBasis::Cross), Verdict::NEUTRAL);
        assert_eq!(Verdict::weighted(-1.5, true, SignalBasis::Pullback).to_string(), "SELL (PULLBACK)");
        assert_eq!(Verdict::weighted(-3.2, false, SignalBasis::Pullback).to_string(), "STRONG SELL (TREND)");
    }

    #[test]
    fn side_normalisation() {
        assert_eq!(Verdict::weighted(3.0, true, SignalBasis::Cross).side(), Some(Side::Buy));
        assert_eq!(Verdict::weighted(-2.0, false, SignalBasis::Cross).side(), Some(Side::Sell));
        assert_eq!(Verdict::NEUTRAL.side(), None);
        assert_eq!(Verdict::Trend(TrendBias::StrongUp).side(), None);
    }

    #[test]
    fn score_truncates_toward_zero() {
        let readings = vec![
            TimeframeReading::weighted(Timeframe::M15, -1, 90, Pattern::DeathCross),
            TimeframeReading::weighted(Timeframe::H1, -1, 80, Pattern::Aligned),
        ];
        let result = StrategyResult::from_readings(StrategyKind::MaCross, readings, |s, e| {
            Verdict::weighted(s, e, SignalBasis::Cross)
        });
        assert!((result.raw_score + 1.7).abs() < 1e-12);
        assert_eq!(result.score, -1);
        assert!(result.event_detected);
        assert_eq!(result.overall.to_string(), "SELL (CROSS)");
    }
}

/// Hand-built series shared by the strategy, scorer and engine tests.
#[cfg(test)]
pub(crate) mod testutil {
    use crate::market_data::{Candle, Series, SeriesByTimeframe};
    use crate::types::Timeframe;

    /// Bars one hour apart with a fixed half-range around each close.
    pub fn series_from_closes(closes: &[f64]) -> Series {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                open_time: i as i64 * 3_600_000,
                open: c,
                high: c + 0.0005,
                low: c - 0.0005,
                close: c,
                volume: 100,
            })
            .collect();
        Series::new(candles)
    }

    /// `len` closes moving by `step` per bar from `start`.
    pub fn linear(start: f64, step: f64, len: usize) -> Vec<f64> {
        (0..len).map(|i| start + step * i as f64).collect()
    }

    pub fn rising(len: usize) -> Series {
        series_from_closes(&linear(1.0, 0.001, len))
    }

    pub fn falling(len: usize) -> Series {
        series_from_closes(&linear(2.0, -0.001, len))
    }

    /// The same series on every timeframe.
    pub fn all_timeframes(series: &Series) -> SeriesByTimeframe {
        let mut map = SeriesByTimeframe::new();
        for tf in Timeframe::ALL {
            map.insert(tf, series.clone());
        }
        map
    }
}
