// =============================================================================
// Central Application State — Multi-Timeframe Screener
// =============================================================================
//
// Shared by the scan loop and the dashboard API through `Arc<AppState>`.
//
// Thread safety:
//   - Atomic counters for scan numbering and version tracking.
//   - parking_lot::RwLock for snapshots and short-lived collections.
//   - tokio::sync::Mutex around the alert history, held across the whole
//     check-send-update step of a cycle so two overlapping cycles can never
//     both observe "no alert yet" for the same instrument.
// =============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::alerts::{AlertHistory, Notifier, SentAlert};
use crate::market_data::CandleSource;
use crate::runtime_config::RuntimeConfig;
use crate::scanner::ScanSnapshot;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Maximum number of sent alerts to retain for the dashboard.
const MAX_RECENT_ALERTS: usize = 100;

pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Incremented on every published snapshot, alert or error.
    pub state_version: AtomicU64,
    /// Number of scan cycles started since boot.
    pub scan_count: AtomicU64,
    /// Set while a scan cycle runs; a second concurrent cycle is refused.
    pub scanning: AtomicBool,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Collaborators ───────────────────────────────────────────────────
    pub candle_source: Arc<dyn CandleSource>,
    pub notifier: Arc<dyn Notifier>,

    // ── Alerting ────────────────────────────────────────────────────────
    pub alert_history: tokio::sync::Mutex<AlertHistory>,
    pub recent_alerts: RwLock<Vec<SentAlert>>,

    // ── Results ─────────────────────────────────────────────────────────
    pub latest_scan: RwLock<Option<Arc<ScanSnapshot>>>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        candle_source: Arc<dyn CandleSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            scan_count: AtomicU64::new(0),
            scanning: AtomicBool::new(false),
            runtime_config: Arc::new(RwLock::new(config)),
            candle_source,
            notifier,
            alert_history: tokio::sync::Mutex::new(AlertHistory::new()),
            recent_alerts: RwLock::new(Vec::new()),
            latest_scan: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    /// Claim the scanning flag. Returns `false` when a cycle is already
    /// running.
    pub fn try_begin_scan(&self) -> bool {
        self.scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_scan(&self) {
        self.scanning.store(false, Ordering::SeqCst);
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    // ── Results ─────────────────────────────────────────────────────────

    /// Publish a finished cycle: replace the latest snapshot and append its
    /// alerts to the ring buffer.
    pub fn publish_scan(&self, snapshot: ScanSnapshot) {
        {
            let mut alerts = self.recent_alerts.write();
            alerts.extend(snapshot.alerts_sent.iter().cloned());
            let overflow = alerts.len().saturating_sub(MAX_RECENT_ALERTS);
            alerts.drain(..overflow);
        }
        *self.latest_scan.write() = Some(Arc::new(snapshot));
        self.increment_version();
    }

    pub fn latest_scan(&self) -> Option<Arc<ScanSnapshot>> {
        self.latest_scan.read().clone()
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message, evicting the oldest beyond
    /// [`MAX_RECENT_ERRORS`].
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertReason, LogNotifier};
    use crate::market_data::{CandleSource, Series};
    use crate::strategies::StrategyKind;
    use crate::types::{Side, Timeframe};
    use anyhow::Result;
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl CandleSource for EmptySource {
        async fn fetch_series(&self, _: &str, _: Timeframe, _: usize) -> Result<Option<Series>> {
            Ok(None)
        }
    }

    fn state() -> AppState {
        AppState::new(RuntimeConfig::default(), Arc::new(EmptySource), Arc::new(LogNotifier))
    }

    fn snapshot(id: u64, alerts: usize) -> ScanSnapshot {
        let now = Utc::now();
        ScanSnapshot {
            scan_id: id,
            started_at: now,
            finished_at: now,
            analyses: Vec::new(),
            alerts_sent: (0..alerts)
                .map(|i| SentAlert {
                    instrument: format!("I{i}"),
                    reason: AlertReason::New,
                    side: Side::Buy,
                    signal: "BUY".into(),
                    confidence: 80,
                    strategy: StrategyKind::MaCross,
                    sent_at: now,
                })
                .collect(),
            failed_fetches: 0,
        }
    }

    #[test]
    fn scanning_flag_is_exclusive() {
        let s = state();
        assert!(s.try_begin_scan());
        assert!(!s.try_begin_scan());
        assert!(s.is_scanning());
        s.end_scan();
        assert!(s.try_begin_scan());
    }

    #[test]
    fn publish_keeps_latest_and_caps_alerts() {
        let s = state();
        let v0 = s.current_state_version();
        s.publish_scan(snapshot(1, 80));
        s.publish_scan(snapshot(2, 40));
        assert_eq!(s.latest_scan().unwrap().scan_id, 2);
        assert_eq!(s.recent_alerts.read().len(), MAX_RECENT_ALERTS);
        assert_eq!(s.current_state_version(), v0 + 2);
    }

    #[test]
    fn error_log_is_capped() {
        let s = state();
        for i in 0..60 {
            s.push_error(format!("e{i}"));
        }
        let errors = s.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "e10");
    }
}
