// =============================================================================
// Runtime Configuration — screener settings with atomic save
// =============================================================================
//
// Every tunable of the signal engine lives here: indicator periods, strategy
// thresholds, confidence weights, alert de-duplication windows and the scan
// cadence.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file, and an empty `{}` yields the
// stock configuration.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::Timeframe;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_instruments() -> Vec<String> {
    [
        "EUR_USD",
        "USD_JPY",
        "GBP_USD",
        "AUD_USD",
        "EUR_AUD",
        "AUD_JPY",
        "GBP_JPY",
        "GBP_AUD",
        "XAU_USD",
        "WTICO_USD",
        "NAS100_USD",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_candle_count() -> usize {
    500
}

fn default_scan_interval_secs() -> u64 {
    900
}

fn default_retry_delay_secs() -> u64 {
    60
}

fn default_startup_delay_secs() -> u64 {
    0
}

fn default_fast_period() -> usize {
    20
}

fn default_medium_period() -> usize {
    50
}

fn default_slow_period() -> usize {
    200
}

fn default_adx_period() -> usize {
    14
}

fn default_adx_strong() -> f64 {
    25.0
}

fn default_adx_weak() -> f64 {
    20.0
}

fn default_min_alignment_bars() -> usize {
    3
}

fn default_lookback_bars() -> usize {
    20
}

fn default_strong_alignment_bars() -> usize {
    5
}

fn default_fast_band_pct() -> f64 {
    0.2
}

fn default_medium_band_pct() -> f64 {
    0.2
}

fn default_slow_band_pct() -> f64 {
    0.3
}

fn default_atr_period() -> usize {
    14
}

fn default_supertrend_multiplier() -> f64 {
    4.0
}

fn default_sr_lookback() -> usize {
    20
}

fn default_cluster_tolerance() -> f64 {
    0.001
}

fn default_max_levels() -> usize {
    3
}

fn default_min_confidence() -> u32 {
    70
}

fn default_volatility_lookback() -> usize {
    50
}

fn default_volatility_timeframe() -> Timeframe {
    Timeframe::H4
}

fn default_cooldown_minutes() -> i64 {
    60
}

fn default_confidence_boost() -> u32 {
    15
}

fn default_win_rates() -> HashMap<String, u32> {
    let mut rates = HashMap::new();
    rates.insert("ma_cross".to_string(), 65);
    rates.insert("ma_pullback".to_string(), 70);
    rates.insert("sma_trend".to_string(), 68);
    rates.insert("combined".to_string(), 73);
    rates
}

fn default_win_rate_pct() -> u32 {
    60
}

// =============================================================================
// Indicator / strategy parameters
// =============================================================================

/// SMMA trend-alignment strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmmaParams {
    #[serde(default = "default_fast_period")]
    pub fast: usize,
    #[serde(default = "default_medium_period")]
    pub medium: usize,
    #[serde(default = "default_slow_period")]
    pub slow: usize,
    /// Attach an ADX strength label to every timeframe.
    #[serde(default = "default_true")]
    pub use_adx: bool,
}

impl Default for SmmaParams {
    fn default() -> Self {
        Self {
            fast: default_fast_period(),
            medium: default_medium_period(),
            slow: default_slow_period(),
            use_adx: true,
        }
    }
}

/// ADX period and strength buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdxParams {
    #[serde(default = "default_adx_period")]
    pub period: usize,
    /// ADX at or above this is STRONG.
    #[serde(default = "default_adx_strong")]
    pub strong: f64,
    /// ADX at or above this (and below `strong`) is MODERATE.
    #[serde(default = "default_adx_weak")]
    pub weak: f64,
}

impl Default for AdxParams {
    fn default() -> Self {
        Self {
            period: default_adx_period(),
            strong: default_adx_strong(),
            weak: default_adx_weak(),
        }
    }
}

/// Moving-average crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaCrossParams {
    #[serde(default = "default_fast_period")]
    pub fast: usize,
    #[serde(default = "default_medium_period")]
    pub slow: usize,
    #[serde(default = "default_slow_period")]
    pub confirm: usize,
    /// Minimum |fast - slow| (price units) for a crossover to count.
    #[serde(default)]
    pub min_separation: f64,
}

impl Default for MaCrossParams {
    fn default() -> Self {
        Self {
            fast: default_fast_period(),
            slow: default_medium_period(),
            confirm: default_slow_period(),
            min_separation: 0.0,
        }
    }
}

/// Moving-average pullback strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullbackParams {
    #[serde(default = "default_fast_period")]
    pub fast: usize,
    #[serde(default = "default_medium_period")]
    pub medium: usize,
    #[serde(default = "default_slow_period")]
    pub slow: usize,
    /// Consecutive aligned bars required before a pullback counts.
    #[serde(default = "default_min_alignment_bars")]
    pub min_alignment_bars: usize,
    /// How far back the aligned-bar count scans.
    #[serde(default = "default_lookback_bars")]
    pub lookback_bars: usize,
    /// Aligned-bar count that upgrades the pullback strength.
    #[serde(default = "default_strong_alignment_bars")]
    pub strong_alignment_bars: usize,
    /// Band (percent of the MA) around each MA that counts as touching it.
    #[serde(default = "default_fast_band_pct")]
    pub fast_band_pct: f64,
    #[serde(default = "default_medium_band_pct")]
    pub medium_band_pct: f64,
    #[serde(default = "default_slow_band_pct")]
    pub slow_band_pct: f64,
}

impl Default for PullbackParams {
    fn default() -> Self {
        Self {
            fast: default_fast_period(),
            medium: default_medium_period(),
            slow: default_slow_period(),
            min_alignment_bars: default_min_alignment_bars(),
            lookback_bars: default_lookback_bars(),
            strong_alignment_bars: default_strong_alignment_bars(),
            fast_band_pct: default_fast_band_pct(),
            medium_band_pct: default_medium_band_pct(),
            slow_band_pct: default_slow_band_pct(),
        }
    }
}

/// ATR-band supertrend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupertrendParams {
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    #[serde(default = "default_supertrend_multiplier")]
    pub multiplier: f64,
}

impl Default for SupertrendParams {
    fn default() -> Self {
        Self {
            atr_period: default_atr_period(),
            multiplier: default_supertrend_multiplier(),
        }
    }
}

/// Pivot, support/resistance and price-action context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalParams {
    /// Minimum bars before swing levels are searched.
    #[serde(default = "default_sr_lookback")]
    pub sr_lookback: usize,
    /// Relative distance under which neighbouring swing levels merge.
    #[serde(default = "default_cluster_tolerance")]
    pub cluster_tolerance: f64,
    /// Clusters kept per side, highest first.
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
}

impl Default for TechnicalParams {
    fn default() -> Self {
        Self {
            sr_lookback: default_sr_lookback(),
            cluster_tolerance: default_cluster_tolerance(),
            max_levels: default_max_levels(),
            atr_period: default_atr_period(),
        }
    }
}

// =============================================================================
// Confidence scoring
// =============================================================================

/// Maximum points of each confidence sub-score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    #[serde(default = "ConfidenceWeights::default_alignment")]
    pub timeframe_alignment: u32,
    #[serde(default = "ConfidenceWeights::default_component")]
    pub ma_convergence: u32,
    #[serde(default = "ConfidenceWeights::default_component")]
    pub trend_strength: u32,
    #[serde(default = "ConfidenceWeights::default_component")]
    pub volatility: u32,
    #[serde(default = "ConfidenceWeights::default_component")]
    pub win_rate: u32,
}

impl ConfidenceWeights {
    pub const DEFAULT_ALIGNMENT: u32 = 40;
    pub const DEFAULT_COMPONENT: u32 = 15;

    fn default_alignment() -> u32 {
        Self::DEFAULT_ALIGNMENT
    }

    fn default_component() -> u32 {
        Self::DEFAULT_COMPONENT
    }
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            timeframe_alignment: Self::DEFAULT_ALIGNMENT,
            ma_convergence: Self::DEFAULT_COMPONENT,
            trend_strength: Self::DEFAULT_COMPONENT,
            volatility: Self::DEFAULT_COMPONENT,
            win_rate: Self::DEFAULT_COMPONENT,
        }
    }
}

/// Confidence scorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceParams {
    #[serde(default)]
    pub weights: ConfidenceWeights,
    /// `meets_threshold` is set at or above this confidence.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u32,
    #[serde(default = "default_atr_period")]
    pub volatility_atr_period: usize,
    #[serde(default = "default_volatility_lookback")]
    pub volatility_lookback: usize,
    /// Timeframe whose series feeds the volatility sub-score.
    #[serde(default = "default_volatility_timeframe")]
    pub volatility_timeframe: Timeframe,
    /// Historical win rate (percent) by strategy key.
    #[serde(default = "default_win_rates")]
    pub win_rates: HashMap<String, u32>,
    /// Win rate (percent) for strategies missing from `win_rates`.
    #[serde(default = "default_win_rate_pct")]
    pub default_win_rate: u32,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            weights: ConfidenceWeights::default(),
            min_confidence: default_min_confidence(),
            volatility_atr_period: default_atr_period(),
            volatility_lookback: default_volatility_lookback(),
            volatility_timeframe: default_volatility_timeframe(),
            win_rates: default_win_rates(),
            default_win_rate: default_win_rate_pct(),
        }
    }
}

// =============================================================================
// Alerting
// =============================================================================

/// Alert de-duplication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertParams {
    /// Signals below this confidence never alert.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u32,
    /// Minutes after which an unchanged signal may alert again.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,
    /// Confidence rise (points) that re-alerts an unchanged signal.
    #[serde(default = "default_confidence_boost")]
    pub confidence_boost: u32,
}

impl Default for AlertParams {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            cooldown_minutes: default_cooldown_minutes(),
            confidence_boost: default_confidence_boost(),
        }
    }
}

impl AlertParams {
    /// Cooldown window. Negative values mean no cooldown; values beyond
    /// chrono's range saturate instead of panicking.
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.cooldown_minutes.max(0)).unwrap_or(chrono::Duration::MAX)
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the screener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Universe & cadence --------------------------------------------------

    /// Instruments scanned every cycle, in data-provider notation (EUR_USD).
    #[serde(default = "default_instruments")]
    pub instruments: Vec<String>,

    /// Bars requested per (instrument, timeframe).
    #[serde(default = "default_candle_count")]
    pub candle_count: usize,

    /// Seconds between scan cycles.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Seconds to wait after a failed scan cycle.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Seconds to wait before the first scan cycle.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    // --- Engine --------------------------------------------------------------

    #[serde(default)]
    pub smma: SmmaParams,

    #[serde(default)]
    pub adx: AdxParams,

    #[serde(default)]
    pub ma_cross: MaCrossParams,

    #[serde(default)]
    pub ma_pullback: PullbackParams,

    #[serde(default)]
    pub supertrend: SupertrendParams,

    #[serde(default)]
    pub technical: TechnicalParams,

    #[serde(default)]
    pub confidence: ConfidenceParams,

    #[serde(default)]
    pub alerts: AlertParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            candle_count: default_candle_count(),
            scan_interval_secs: default_scan_interval_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            startup_delay_secs: default_startup_delay_secs(),
            smma: SmmaParams::default(),
            adx: AdxParams::default(),
            ma_cross: MaCrossParams::default(),
            ma_pullback: PullbackParams::default(),
            supertrend: SupertrendParams::default(),
            technical: TechnicalParams::default(),
            confidence: ConfidenceParams::default(),
            alerts: AlertParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            instruments = config.instruments.len(),
            scan_interval_secs = config.scan_interval_secs,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}

/// Human-facing instrument name: the provider code without separators, with
/// a few commodity/index aliases.
pub fn display_name(instrument: &str) -> String {
    match instrument {
        "XAU_USD" => "XAUUSD".to_string(),
        "WTICO_USD" => "WTI".to_string(),
        "NAS100_USD" => "NAS100".to_string(),
        other => other.replace('_', ""),
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_saturates_out_of_range_minutes() {
        let mut alerts = AlertParams::default();
        assert_eq!(alerts.cooldown(), chrono::Duration::minutes(60));
        alerts.cooldown_minutes = i64::MAX;
        assert_eq!(alerts.cooldown(), chrono::Duration::MAX);
        alerts.cooldown_minutes = -5;
        assert_eq!(alerts.cooldown(), chrono::Duration::zero());
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.instruments.len(), 11);
        assert_eq!(cfg.instruments[0], "EUR_USD");
        assert_eq!(cfg.candle_count, 500);
        assert_eq!(cfg.scan_interval_secs, 900);
        assert_eq!(cfg.smma.slow, 200);
        assert_eq!(cfg.adx.period, 14);
        assert!((cfg.supertrend.multiplier - 4.0).abs() < f64::EPSILON);
        assert_eq!(cfg.technical.sr_lookback, 20);
        assert_eq!(cfg.technical.max_levels, 3);
        assert_eq!(cfg.ma_pullback.min_alignment_bars, 3);
        assert_eq!(cfg.confidence.min_confidence, 70);
        assert_eq!(cfg.confidence.weights.timeframe_alignment, 40);
        assert_eq!(cfg.alerts.cooldown_minutes, 60);
        assert_eq!(cfg.alerts.confidence_boost, 15);
        assert_eq!(cfg.confidence.volatility_timeframe, Timeframe::H4);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.instruments.len(), 11);
        assert!(cfg.smma.use_adx);
        assert_eq!(cfg.confidence.win_rates.get("ma_pullback"), Some(&70));
        assert_eq!(cfg.confidence.default_win_rate, 60);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "instruments": ["EUR_USD"], "alerts": { "cooldown_minutes": 30 },
                        "ma_cross": { "min_separation": 0.0005 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.instruments, vec!["EUR_USD"]);
        assert_eq!(cfg.alerts.cooldown_minutes, 30);
        assert_eq!(cfg.alerts.confidence_boost, 15);
        assert_eq!(cfg.ma_cross.confirm, 200);
        assert!((cfg.ma_cross.min_separation - 0.0005).abs() < f64::EPSILON);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("mtf-screener-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("screener_config.json");

        let mut cfg = RuntimeConfig::default();
        cfg.instruments = vec!["GBP_USD".into()];
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.instruments, vec!["GBP_USD"]);
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_missing_file_is_error() {
        assert!(RuntimeConfig::load("/definitely/not/here.json").is_err());
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("EUR_USD"), "EURUSD");
        assert_eq!(display_name("XAU_USD"), "XAUUSD");
        assert_eq!(display_name("WTICO_USD"), "WTI");
        assert_eq!(display_name("NAS100_USD"), "NAS100");
    }
}
