// =============================================================================
// Outbound Notifiers
// =============================================================================
//
// The alert state machine only needs "send this message, tell me whether it
// went out".  `TelegramNotifier` posts HTML messages through the Bot API;
// `LogNotifier` logs them and always succeeds, which is what runs when no
// Telegram credentials are configured.
// =============================================================================

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use crate::engine::InstrumentAnalysis;
use crate::types::{Side, Timeframe};

use super::state_machine::AlertReason;

/// Telegram Bot API host.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. An `Err` means it was not delivered.
    async fn send(&self, message: &str) -> Result<()>;

    fn name(&self) -> &'static str;
}

// =============================================================================
// Telegram
// =============================================================================

pub struct TelegramNotifier {
    base_url: String,
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self> {
        Self::with_base_url(bot_token, chat_id, TELEGRAM_API_URL)
    }

    pub fn with_base_url(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build Telegram HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            client,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "HTML",
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("POST sendMessage request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Telegram sendMessage returned {status}: {text}");
        }

        debug!(chat_id = %self.chat_id, "Telegram message delivered");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

// =============================================================================
// Log-only
// =============================================================================

#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        info!(message = %message, "alert (log only)");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// =============================================================================
// Message formatting
// =============================================================================

fn trend_label(direction: i8) -> &'static str {
    match direction {
        d if d > 0 => "✅ UP",
        d if d < 0 => "❌ DOWN",
        _ => "⚠️ MIXED",
    }
}

/// HTML alert body for Telegram.
pub fn format_alert_message(
    analysis: &InstrumentAnalysis,
    reason: AlertReason,
    now: DateTime<Utc>,
) -> String {
    let (marker, direction) = match analysis.side() {
        Some(Side::Buy) => ("🟢", "BUY"),
        Some(Side::Sell) => ("🔴", "SELL"),
        None => ("⚪", "NEUTRAL"),
    };
    let price = analysis
        .current_price
        .map(|p| format!("{p:.5}"))
        .unwrap_or_else(|| "N/A".to_string());

    let mut msg = format!(
        "<b>{marker} {direction} SIGNAL - {name}</b>\n\n\
         <b>Confidence:</b> {confidence}%\n\
         <b>Strategy:</b> {strategy}\n\
         <b>Signal:</b> {signal}\n\
         <b>Current Price:</b> {price}\n\n\
         <b>Timeframes:</b>\n",
        name = analysis.display_name,
        confidence = analysis.best_confidence,
        strategy = analysis.best_strategy,
        signal = analysis.overall_signal,
    );
    for tf in Timeframe::ALL {
        msg.push_str(&format!(
            "{tf}: {}\n",
            trend_label(analysis.smma_trend.direction(tf))
        ));
    }
    msg.push_str(&format!(
        "\n<b>Reason:</b> {reason}\n⏰ {}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    msg
}
