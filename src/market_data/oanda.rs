// =============================================================================
// OANDA v20 REST Client — historical mid-price candles
// =============================================================================
//
// Only `GET /v3/instruments/{instrument}/candles` is used. The API key is sent
// as a bearer header and is never logged.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, instrument, warn};

use super::candle::{Candle, Series};
use super::source::CandleSource;
use crate::types::Timeframe;

/// Practice (fxTrade Practice) REST endpoint.
pub const PRACTICE_BASE_URL: &str = "https://api-fxpractice.oanda.com";

/// OANDA REST client for candle history.
#[derive(Clone)]
pub struct OandaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OandaClient {
    /// Create a new `OandaClient` against `base_url`.
    ///
    /// # Arguments
    /// * `api_key`: personal access token (sent as `Authorization: Bearer`).
    /// * `base_url`: REST host, e.g. [`PRACTICE_BASE_URL`].
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut default_headers = HeaderMap::new();
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
            default_headers.insert(AUTHORIZATION, val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build OANDA HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "OandaClient initialised");

        Ok(Self { base_url, client })
    }
}

/// OANDA granularity code for a timeframe.
pub fn granularity(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::M5 => "M5",
        Timeframe::M15 => "M15",
        Timeframe::H1 => "H1",
        Timeframe::H4 => "H4",
        Timeframe::D => "D",
    }
}

#[async_trait]
impl CandleSource for OandaClient {
    /// GET /v3/instruments/{instrument}/candles with mid prices.
    #[instrument(skip(self), name = "oanda::fetch_series")]
    async fn fetch_series(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Option<Series>> {
        let url = format!(
            "{}/v3/instruments/{}/candles?granularity={}&count={}&price=M",
            self.base_url,
            instrument,
            granularity(timeframe),
            count
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET /v3/instruments/{instrument}/candles request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(instrument, %timeframe, %status, "OANDA candles request rejected");
            return Ok(None);
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse OANDA candles response")?;

        let series = parse_candles(&body)?;
        if series.is_empty() {
            warn!(instrument, %timeframe, "no candles returned");
            return Ok(None);
        }

        debug!(instrument, %timeframe, bars = series.len(), "candles fetched");
        Ok(Some(series))
    }
}

/// Parse an OANDA candles payload, keeping only completed bars.
///
/// Expected shape:
/// ```json
/// { "candles": [ { "complete": true, "time": "...", "volume": 10,
///                  "mid": { "o": "1.1", "h": "1.2", "l": "1.0", "c": "1.15" } } ] }
/// ```
pub fn parse_candles(body: &serde_json::Value) -> Result<Series> {
    let raw = match body.get("candles").and_then(|v| v.as_array()) {
        Some(arr) => arr,
        None => return Ok(Series::default()),
    };

    let mut candles = Vec::with_capacity(raw.len());
    for c in raw {
        if !c["complete"].as_bool().unwrap_or(false) {
            continue;
        }

        let time = c["time"].as_str().context("missing field time")?;
        let open_time = DateTime::parse_from_rfc3339(time)
            .with_context(|| format!("invalid candle time: {time}"))?
            .timestamp_millis();

        let mid = &c["mid"];
        candles.push(Candle {
            open_time,
            open: parse_string_f64(&mid["o"], "mid.o")?,
            high: parse_string_f64(&mid["h"], "mid.h")?,
            low: parse_string_f64(&mid["l"], "mid.l")?,
            close: parse_string_f64(&mid["c"], "mid.c")?,
            volume: c["volume"].as_u64().unwrap_or(0),
        });
    }

    Ok(Series::new(candles))
}

/// OANDA sends prices as JSON strings.
fn parse_string_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}")),
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_error_names_the_instrument() {
        // Nothing listens on port 1.
        let client = OandaClient::new("key", "http://127.0.0.1:1").unwrap();
        let err = client
            .fetch_series("EUR_USD", Timeframe::H1, 10)
            .await
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("/v3/instruments/EUR_USD/candles"), "{message}");
        assert!(!message.contains("{instrument}"));
    }

    #[test]
    fn parse_keeps_only_complete_candles() {
        let json = serde_json::json!({
            "instrument": "EUR_USD",
            "granularity": "H1",
            "candles": [
                {
                    "complete": true,
                    "volume": 1200,
                    "time": "2024-01-02T10:00:00.000000000Z",
                    "mid": { "o": "1.09410", "h": "1.09520", "l": "1.09380", "c": "1.09500" }
                },
                {
                    "complete": false,
                    "volume": 40,
                    "time": "2024-01-02T11:00:00.000000000Z",
                    "mid": { "o": "1.09500", "h": "1.09510", "l": "1.09490", "c": "1.09505" }
                }
            ]
        });
        let series = parse_candles(&json).expect("should parse");
        assert_eq!(series.len(), 1);
        let bar = &series.candles()[0];
        assert!((bar.close - 1.095).abs() < 1e-12);
        assert_eq!(bar.volume, 1200);
        assert_eq!(bar.open_time, 1_704_189_600_000);
    }

    #[test]
    fn parse_missing_candles_is_empty() {
        let series = parse_candles(&serde_json::json!({ "errorMessage": "nope" })).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn parse_rejects_garbage_prices() {
        let json = serde_json::json!({
            "candles": [{
                "complete": true,
                "volume": 1,
                "time": "2024-01-02T10:00:00Z",
                "mid": { "o": "abc", "h": "1", "l": "1", "c": "1" }
            }]
        });
        assert!(parse_candles(&json).is_err());
    }

    #[test]
    fn granularity_codes() {
        assert_eq!(granularity(Timeframe::M15), "M15");
        assert_eq!(granularity(Timeframe::D), "D");
    }
}
