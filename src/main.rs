// =============================================================================
// MTF Screener — Main Entry Point
// =============================================================================
//
// Loads the config, wires the candle source and notifier, serves the dashboard
// API and runs scan cycles until Ctrl+C.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mtf_screener::alerts::{LogNotifier, Notifier, TelegramNotifier};
use mtf_screener::api;
use mtf_screener::app_state::AppState;
use mtf_screener::market_data::oanda::{OandaClient, PRACTICE_BASE_URL};
use mtf_screener::runtime_config::RuntimeConfig;
use mtf_screener::scanner::run_scan_cycle;

const DEFAULT_CONFIG_PATH: &str = "screener_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        MTF Screener — Starting Up                        ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("SCREENER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Override instruments from env if available.
    if let Ok(list) = std::env::var("SCREENER_INSTRUMENTS") {
        let instruments: Vec<String> = list
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if !instruments.is_empty() {
            config.instruments = instruments;
        }
    }

    info!(instruments = ?config.instruments, "Configured instruments");
    info!(
        scan_interval_secs = config.scan_interval_secs,
        min_confidence = config.alerts.min_confidence,
        cooldown_minutes = config.alerts.cooldown_minutes,
        "Scanner cadence and alert gating"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let api_key = std::env::var("OANDA_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        warn!("OANDA_API_KEY is not set, candle requests will be rejected");
    }
    let base_url =
        std::env::var("OANDA_BASE_URL").unwrap_or_else(|_| PRACTICE_BASE_URL.into());
    let source = Arc::new(OandaClient::new(api_key, base_url)?);

    let notifier: Arc<dyn Notifier> = match (
        std::env::var("TELEGRAM_BOT_TOKEN"),
        std::env::var("TELEGRAM_CHAT_ID"),
    ) {
        (Ok(token), Ok(chat)) if !token.is_empty() && !chat.is_empty() => {
            Arc::new(TelegramNotifier::new(token, chat)?)
        }
        _ => {
            warn!("Telegram credentials missing, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };
    info!(notifier = notifier.name(), "Alert channel ready");

    // ── 3. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config, source, notifier));

    // ── 4. Start the API server ──────────────────────────────────────────
    let bind_addr =
        std::env::var("SCREENER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // ── 5. Scan loop ─────────────────────────────────────────────────────
    let scan_state = state.clone();
    tokio::spawn(async move {
        let startup_delay = scan_state.runtime_config.read().startup_delay_secs;
        if startup_delay > 0 {
            info!(secs = startup_delay, "Waiting before first scan");
            tokio::time::sleep(Duration::from_secs(startup_delay)).await;
        }

        loop {
            let (interval, retry) = {
                let cfg = scan_state.runtime_config.read();
                (cfg.scan_interval_secs, cfg.retry_delay_secs)
            };

            let delay = match run_scan_cycle(&scan_state).await {
                Ok(snapshot) => {
                    info!(
                        scan_id = snapshot.scan_id,
                        alerts = snapshot.alerts_sent.len(),
                        next_in_secs = interval,
                        "Scan cycle finished"
                    );
                    interval
                }
                Err(e) => {
                    error!(error = %e, retry_in_secs = retry, "Scan cycle failed");
                    retry
                }
            };
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save(&config_path) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("MTF Screener shut down complete.");
    Ok(())
}
