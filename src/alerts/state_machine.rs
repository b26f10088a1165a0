// =============================================================================
// Alert State Machine — when is a recurring signal worth re-notifying?
// =============================================================================
//
// Per instrument:  NoAlert  ->  Alerted(signal, confidence, sent_at)
//
// Only BUY/SELL signals at or above the alert threshold are considered.
// From NoAlert every such signal alerts (NEW).  From Alerted, checked in
// order:
//   1. verdict label differs from the stored one          SIGNAL_CHANGE
//   2. confidence >= stored confidence + boost            CONFIDENCE_BOOST
//   3. now - sent_at >= cooldown                          COOLDOWN_EXPIRED
//   otherwise                                             SKIP
//
// History is updated only after the notifier reports success; a failed send
// leaves the record as it was so the next cycle retries under the same rule.
// The history is explicitly owned by the caller and passed in by `&mut`;
// each accepted send is committed immediately, so dropping the dispatch
// future mid-send never loses earlier records.
// =============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::InstrumentAnalysis;
use crate::runtime_config::AlertParams;
use crate::strategies::StrategyKind;
use crate::types::Side;

use super::notifier::{format_alert_message, Notifier};

// =============================================================================
// Types
// =============================================================================

/// Why an alert was (or was not) sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertReason {
    New,
    SignalChange,
    ConfidenceBoost,
    CooldownExpired,
    Skip,
}

impl std::fmt::Display for AlertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::New => "NEW",
            Self::SignalChange => "SIGNAL_CHANGE",
            Self::ConfidenceBoost => "CONFIDENCE_BOOST",
            Self::CooldownExpired => "COOLDOWN_EXPIRED",
            Self::Skip => "SKIP",
        })
    }
}

/// The last alert sent for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub side: Side,
    /// Full verdict label, e.g. "STRONG BUY (CROSS)".
    pub signal: String,
    pub confidence: u32,
    pub sent_at: DateTime<Utc>,
}

/// Last alert per instrument. Records are overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertHistory {
    records: HashMap<String, AlertRecord>,
}

impl AlertHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, instrument: &str) -> Option<&AlertRecord> {
        self.records.get(instrument)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AlertRecord)> {
        self.records.iter()
    }

    fn record(&mut self, instrument: &str, record: AlertRecord) {
        self.records.insert(instrument.to_string(), record);
    }
}

/// The state machine's verdict for one instrument's signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvaluation {
    pub instrument: String,
    pub reason: AlertReason,
    pub side: Side,
    pub signal: String,
    pub confidence: u32,
    pub strategy: StrategyKind,
}

impl AlertEvaluation {
    pub fn should_send(&self) -> bool {
        self.reason != AlertReason::Skip
    }
}

/// An alert the notifier accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentAlert {
    pub instrument: String,
    pub reason: AlertReason,
    pub side: Side,
    pub signal: String,
    pub confidence: u32,
    pub strategy: StrategyKind,
    pub sent_at: DateTime<Utc>,
}

// =============================================================================
// Transition rules
// =============================================================================

/// Evaluate one analysis against its stored record.  `None` when the signal
/// does not qualify at all (neutral, or below the alert threshold).
pub fn evaluate(
    analysis: &InstrumentAnalysis,
    previous: Option<&AlertRecord>,
    params: &AlertParams,
    now: DateTime<Utc>,
) -> Option<AlertEvaluation> {
    let side = analysis.side()?;
    let confidence = analysis.best_confidence;
    if confidence < params.min_confidence {
        return None;
    }
    let signal = analysis.overall_signal.to_string();

    let reason = match previous {
        None => AlertReason::New,
        Some(prev) if prev.signal != signal => AlertReason::SignalChange,
        Some(prev) if confidence >= prev.confidence.saturating_add(params.confidence_boost) => {
            AlertReason::ConfidenceBoost
        }
        Some(prev) if now - prev.sent_at >= params.cooldown() => {
            AlertReason::CooldownExpired
        }
        Some(_) => AlertReason::Skip,
    };

    Some(AlertEvaluation {
        instrument: analysis.instrument.clone(),
        reason,
        side,
        signal,
        confidence,
        strategy: analysis.best_strategy,
    })
}

/// Evaluate every analysis of a cycle against `history` without sending.
/// Non-qualifying instruments are omitted; SKIPs are included.
pub fn evaluate_alerts(
    analyses: &[InstrumentAnalysis],
    history: &AlertHistory,
    params: &AlertParams,
    now: DateTime<Utc>,
) -> Vec<AlertEvaluation> {
    analyses
        .iter()
        .filter_map(|a| evaluate(a, history.get(&a.instrument), params, now))
        .collect()
}

/// Run one cycle of the state machine: evaluate, send through `notifier`,
/// and record every alert the notifier accepted.
///
/// Each instrument is evaluated against the history as updated so far, so
/// the same instrument appearing twice in one cycle cannot alert twice.
pub async fn dispatch_alerts(
    analyses: &[InstrumentAnalysis],
    history: &mut AlertHistory,
    notifier: &dyn Notifier,
    params: &AlertParams,
    now: DateTime<Utc>,
) -> Vec<SentAlert> {
    let mut sent = Vec::new();

    for analysis in analyses {
        let previous = history.get(&analysis.instrument).cloned();
        let Some(eval) = evaluate(analysis, previous.as_ref(), params, now) else {
            continue;
        };

        if !eval.should_send() {
            debug!(
                instrument = %eval.instrument,
                signal = %eval.signal,
                confidence = eval.confidence,
                "alert skipped (already alerted)"
            );
            continue;
        }

        let message = format_alert_message(analysis, eval.reason, now);
        match notifier.send(&message).await {
            Ok(()) => {
                info!(
                    instrument = %eval.instrument,
                    side = %eval.side,
                    confidence = eval.confidence,
                    reason = %eval.reason,
                    previous = previous.as_ref().map(|p| p.signal.as_str()).unwrap_or("-"),
                    notifier = notifier.name(),
                    "alert sent"
                );
                history.record(
                    &eval.instrument,
                    AlertRecord {
                        side: eval.side,
                        signal: eval.signal.clone(),
                        confidence: eval.confidence,
                        sent_at: now,
                    },
                );
                sent.push(SentAlert {
                    instrument: eval.instrument,
                    reason: eval.reason,
                    side: eval.side,
                    signal: eval.signal,
                    confidence: eval.confidence,
                    strategy: eval.strategy,
                    sent_at: now,
                });
            }
            Err(e) => {
                warn!(
                    instrument = %eval.instrument,
                    reason = %eval.reason,
                    error = %e,
                    "alert send failed, state left unchanged for retry"
                );
            }
        }
    }

    sent
}
