// =============================================================================
// Alerts Module
// =============================================================================
//
// - De-duplication state machine over per-instrument alert history
// - Outbound notifiers (Telegram, log-only) and message formatting

pub mod notifier;
pub mod state_machine;

pub use notifier::{format_alert_message, LogNotifier, Notifier, TelegramNotifier};
pub use state_machine::{
    dispatch_alerts, evaluate_alerts, AlertEvaluation, AlertHistory, AlertReason, AlertRecord,
    SentAlert,
};
