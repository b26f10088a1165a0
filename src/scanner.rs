// =============================================================================
// Scanner — one scan cycle over every configured instrument
// =============================================================================
//
//   1. Fetch every (instrument, timeframe) series concurrently
//   2. Analyze each instrument with a `SignalEngine` built from the current
//      config
//   3. Run the alert state machine with exclusive access to the history
//   4. Publish a `ScanSnapshot` for the dashboard
//
// A failed fetch only marks that timeframe absent.  The cycle as a whole
// fails when no instrument returned any data, or when another cycle is
// already running.
// =============================================================================

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::alerts::{dispatch_alerts, SentAlert};
use crate::app_state::AppState;
use crate::engine::{InstrumentAnalysis, SignalEngine};
use crate::market_data::{CandleSource, SeriesByTimeframe};
use crate::types::Timeframe;

/// Everything one finished cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSnapshot {
    pub scan_id: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// In configured instrument order.
    pub analyses: Vec<InstrumentAnalysis>,
    pub alerts_sent: Vec<SentAlert>,
    /// (instrument, timeframe) requests that errored or came back empty.
    pub failed_fetches: usize,
}

impl ScanSnapshot {
    pub fn analysis(&self, instrument: &str) -> Option<&InstrumentAnalysis> {
        self.analyses.iter().find(|a| {
            a.instrument.eq_ignore_ascii_case(instrument)
                || a.display_name.eq_ignore_ascii_case(instrument)
        })
    }
}

/// Fetch every timeframe of one instrument.  Errors and empty responses
/// leave the timeframe out of the map; the count of those is returned too.
pub async fn fetch_instrument(
    source: &dyn CandleSource,
    instrument: &str,
    count: usize,
) -> (SeriesByTimeframe, usize) {
    let mut series = SeriesByTimeframe::new();
    let mut failed = 0;

    for tf in Timeframe::ALL {
        match source.fetch_series(instrument, tf, count).await {
            Ok(Some(s)) => series.insert(tf, s),
            Ok(None) => failed += 1,
            Err(e) => {
                warn!(instrument, timeframe = %tf, error = %e, "candle fetch failed");
                failed += 1;
            }
        }
    }

    (series, failed)
}

/// Holds the scanning flag; releases it on drop so a cancelled cycle does
/// not leave the scanner locked out.
struct ScanFlag<'a>(&'a AppState);

impl<'a> ScanFlag<'a> {
    fn acquire(state: &'a AppState) -> Option<Self> {
        state.try_begin_scan().then_some(Self(state))
    }
}

impl Drop for ScanFlag<'_> {
    fn drop(&mut self) {
        self.0.end_scan();
    }
}

/// Run one full cycle and publish its snapshot on `state`.
pub async fn run_scan_cycle(state: &Arc<AppState>) -> Result<Arc<ScanSnapshot>> {
    let Some(flag) = ScanFlag::acquire(state) else {
        bail!("a scan cycle is already running");
    };
    let result = scan(state).await;
    drop(flag);

    match result {
        Ok(snapshot) => {
            state.publish_scan(snapshot);
            state
                .latest_scan()
                .ok_or_else(|| anyhow::anyhow!("scan snapshot missing after publish"))
        }
        Err(e) => {
            state.push_error(format!("scan failed: {e:#}"));
            Err(e)
        }
    }
}

async fn scan(state: &Arc<AppState>) -> Result<ScanSnapshot> {
    let started_at = Utc::now();
    let scan_id = state.scan_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
    let config = state.runtime_config.read().clone();
    let engine = Arc::new(SignalEngine::from_config(&config));

    info!(scan_id, instruments = config.instruments.len(), "scan cycle started");

    // ── 1 + 2. Fetch and analyze concurrently ───────────────────────────
    let mut tasks = JoinSet::new();
    for (idx, instrument) in config.instruments.iter().enumerate() {
        let source = state.candle_source.clone();
        let engine = engine.clone();
        let instrument = instrument.clone();
        let count = config.candle_count;
        tasks.spawn(async move {
            let (series, failed) = fetch_instrument(source.as_ref(), &instrument, count).await;
            let has_data = !series.is_empty();
            let analysis = engine.analyze(&instrument, &series);
            (idx, analysis, failed, has_data)
        });
    }

    let mut collected = Vec::with_capacity(config.instruments.len());
    let mut failed_fetches = 0;
    let mut with_data = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, analysis, failed, has_data)) => {
                failed_fetches += failed;
                if has_data {
                    with_data += 1;
                }
                collected.push((idx, analysis));
            }
            Err(e) => warn!(error = %e, "instrument task panicked or was cancelled"),
        }
    }
    collected.sort_by_key(|(idx, _)| *idx);
    let analyses: Vec<InstrumentAnalysis> = collected.into_iter().map(|(_, a)| a).collect();

    if with_data == 0 && !config.instruments.is_empty() {
        bail!("no market data returned for any instrument");
    }

    // ── 3. Alerts ───────────────────────────────────────────────────────
    // Records are committed in place as each send succeeds, so a cycle
    // dropped mid-send keeps everything recorded before it.
    let alerts_sent = {
        let mut history = state.alert_history.lock().await;
        dispatch_alerts(
            &analyses,
            &mut history,
            state.notifier.as_ref(),
            &config.alerts,
            Utc::now(),
        )
        .await
    };

    let finished_at = Utc::now();
    info!(
        scan_id,
        analyzed = analyses.len(),
        with_data,
        failed_fetches,
        alerts = alerts_sent.len(),
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        "scan cycle complete"
    );
    for a in &analyses {
        debug!(
            instrument = %a.instrument,
            signal = %a.overall_signal,
            confidence = a.best_confidence,
            "scan result"
        );
    }

    Ok(ScanSnapshot {
        scan_id,
        started_at,
        finished_at,
        analyses,
        alerts_sent,
        failed_fetches,
    })
}
