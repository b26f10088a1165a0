// =============================================================================
// Shared types used across the multi-timeframe screener
// =============================================================================

use serde::{Deserialize, Serialize};

/// Chart resolution a series was sampled at.
///
/// Ordering follows resolution (finest first), which is also the order every
/// strategy walks the timeframes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M5,
    M15,
    H1,
    H4,
    D,
}

impl Timeframe {
    /// Every timeframe the screener analyses, finest first.
    pub const ALL: [Timeframe; 5] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D,
    ];

    /// Timeframes that feed confidence scoring. M5 and D are context only.
    pub const CORE: [Timeframe; 3] = [Timeframe::M15, Timeframe::H1, Timeframe::H4];

    pub fn is_core(self) -> bool {
        Self::CORE.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::M5 => "M5",
            Self::M15 => "M15",
            Self::H1 => "H1",
            Self::H4 => "H4",
            Self::D => "D",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tradable direction of a signal after normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Trend-strength bucket derived from an ADX reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdxStrength {
    Strong,
    Moderate,
    Weak,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl AdxStrength {
    /// Bucket an ADX value: STRONG at or above `strong`, MODERATE at or above
    /// `weak`, WEAK below. An undefined ADX is N/A.
    pub fn classify(adx: Option<f64>, strong: f64, weak: f64) -> Self {
        match adx {
            Some(v) if v >= strong => Self::Strong,
            Some(v) if v >= weak => Self::Moderate,
            Some(_) => Self::Weak,
            None => Self::NotAvailable,
        }
    }
}

impl Default for AdxStrength {
    fn default() -> Self {
        Self::NotAvailable
    }
}

impl std::fmt::Display for AdxStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong => write!(f, "STRONG"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Weak => write!(f, "WEAK"),
            Self::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// Sign of a numeric value as -1, 0 or +1.
pub fn signum_i8(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_inclusive_thresholds() {
        assert_eq!(AdxStrength::classify(Some(25.0), 25.0, 20.0), AdxStrength::Strong);
        assert_eq!(AdxStrength::classify(Some(20.0), 25.0, 20.0), AdxStrength::Moderate);
        assert_eq!(AdxStrength::classify(Some(19.99), 25.0, 20.0), AdxStrength::Weak);
        assert_eq!(AdxStrength::classify(None, 25.0, 20.0), AdxStrength::NotAvailable);
    }

    #[test]
    fn core_timeframes_exclude_context() {
        assert!(!Timeframe::M5.is_core());
        assert!(Timeframe::M15.is_core());
        assert!(Timeframe::H4.is_core());
        assert!(!Timeframe::D.is_core());
    }

    #[test]
    fn adx_strength_serialises_like_labels() {
        let json = serde_json::to_string(&AdxStrength::NotAvailable).unwrap();
        assert_eq!(json, "\"N/A\"");
        let json = serde_json::to_string(&AdxStrength::Moderate).unwrap();
        assert_eq!(json, "\"MODERATE\"");
    }
}
