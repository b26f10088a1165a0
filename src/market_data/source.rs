use anyhow::Result;
use async_trait::async_trait;

use super::candle::Series;
use crate::types::Timeframe;

/// Anything that can hand back historical bars for an instrument.
///
/// `Ok(None)` means the provider had no data for the request; `Err` is a
/// transport or decoding failure. Both leave the timeframe absent for the
/// current cycle.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_series(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Option<Series>>;
}
