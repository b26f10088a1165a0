// =============================================================================
// Multi-timeframe signal screener
// =============================================================================
//
// Indicators → strategies → confidence → selection → alert state machine,
// driven by a periodic scanner and exposed through a small JSON API.
// =============================================================================

pub mod alerts;
pub mod api;
pub mod app_state;
pub mod engine;
pub mod indicators;
pub mod market_data;
pub mod runtime_config;
pub mod scanner;
pub mod signals;
pub mod strategies;
pub mod technical;
pub mod types;
