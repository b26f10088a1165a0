// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`.  Reads are public; the on-demand scan
// trigger requires a valid Bearer token checked via the `AuthBearer`
// extractor.
//
// CORS is permissive so a dashboard on another origin can poll the results.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::alerts::{AlertHistory, SentAlert};
use crate::api::auth::AuthBearer;
use crate::app_state::{AppState, ErrorRecord};
use crate::scanner::{run_scan_cycle, ScanSnapshot};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/results", get(results))
        .route("/api/v1/instruments/:name", get(instrument))
        .route("/api/v1/alerts", get(alerts))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/scan", post(trigger_scan))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    scan_count: u64,
    scanning: bool,
    last_scan_at: Option<DateTime<Utc>>,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        scan_count: state.scan_count.load(std::sync::atomic::Ordering::SeqCst),
        scanning: state.is_scanning(),
        last_scan_at: state.latest_scan().map(|s| s.finished_at),
        uptime_secs: state.start_time.elapsed().as_secs(),
        server_time: Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Results
// =============================================================================

#[derive(Serialize)]
struct ResultsResponse {
    scanning: bool,
    scan_count: u64,
    last_update: Option<DateTime<Utc>>,
    /// Absent until the first cycle completes.
    latest: Option<Arc<ScanSnapshot>>,
    recent_errors: Vec<ErrorRecord>,
}

async fn results(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let latest = state.latest_scan();
    let resp = ResultsResponse {
        scanning: state.is_scanning(),
        scan_count: state.scan_count.load(std::sync::atomic::Ordering::SeqCst),
        last_update: latest.as_ref().map(|s| s.finished_at),
        latest,
        recent_errors: state.recent_errors.read().clone(),
    };
    Json(resp)
}

// =============================================================================
// Single instrument
// =============================================================================

async fn instrument(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    let Some(snapshot) = state.latest_scan() else {
        return error_body(StatusCode::NOT_FOUND, "no scan has completed yet");
    };
    match snapshot.analysis(&name) {
        Some(analysis) => Json(analysis).into_response(),
        None => error_body(StatusCode::NOT_FOUND, format!("unknown instrument: {name}")),
    }
}

// =============================================================================
// Alerts
// =============================================================================

#[derive(Serialize)]
struct AlertsResponse {
    recent: Vec<SentAlert>,
    history: AlertHistory,
}

async fn alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let recent = state.recent_alerts.read().clone();
    let history = state.alert_history.lock().await.clone();
    Json(AlertsResponse { recent, history })
}

// =============================================================================
// On-demand scan (authenticated)
// =============================================================================

async fn trigger_scan(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> Response {
    if state.is_scanning() {
        return error_body(StatusCode::CONFLICT, "a scan cycle is already running");
    }

    info!("on-demand scan requested via API");
    // Detached so a dropped request cannot cancel the cycle halfway.
    let cycle = tokio::spawn(async move { run_scan_cycle(&state).await });
    match cycle.await {
        Ok(Ok(snapshot)) => Json(snapshot).into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "on-demand scan failed");
            error_body(StatusCode::BAD_GATEWAY, format!("{e:#}"))
        }
        Err(e) => {
            warn!(error = %e, "on-demand scan task aborted");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "scan task aborted")
        }
    }
}
