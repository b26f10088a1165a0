use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Timeframe;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single completed OHLC bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time in Unix milliseconds. Strictly increasing within a series.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Time-ascending bars for one (instrument, timeframe) pair.
///
/// A series may hold fewer bars than were requested; every consumer checks
/// the length it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    /// Build a series, dropping any bar whose open time does not advance past
    /// the previous one.
    pub fn new(candles: Vec<Candle>) -> Self {
        let mut ordered: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            if let Some(last) = ordered.last() {
                if candle.open_time <= last.open_time {
                    continue;
                }
            }
            ordered.push(candle);
        }
        Self { candles: ordered }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }
}

impl From<Vec<Candle>> for Series {
    fn from(candles: Vec<Candle>) -> Self {
        Self::new(candles)
    }
}

/// Every series fetched for one instrument in one scan cycle. A timeframe
/// with no entry is absent (the data source returned nothing).
#[derive(Debug, Clone, Default)]
pub struct SeriesByTimeframe {
    series: BTreeMap<Timeframe, Series>,
}

impl SeriesByTimeframe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timeframe: Timeframe, series: Series) {
        self.series.insert(timeframe, series);
    }

    pub fn with(mut self, timeframe: Timeframe, series: Series) -> Self {
        self.insert(timeframe, series);
        self
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&Series> {
        self.series.get(&timeframe)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Last H4 close, falling back to H1. Other timeframes never price.
    pub fn current_price(&self) -> Option<f64> {
        [Timeframe::H4, Timeframe::H1]
            .into_iter()
            .find_map(|tf| self.get(tf).and_then(Series::last_close))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open_time: i64, close: f64) -> Candle {
        Candle {
            open_time,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10,
        }
    }

    #[test]
    fn series_drops_non_advancing_bars() {
        let series = Series::new(vec![bar(0, 1.0), bar(60, 2.0), bar(60, 9.0), bar(30, 9.0), bar(120, 3.0)]);
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn current_price_prefers_h4() {
        let map = SeriesByTimeframe::new()
            .with(Timeframe::M15, Series::new(vec![bar(0, 5.0)]))
            .with(Timeframe::H1, Series::new(vec![bar(0, 7.0)]))
            .with(Timeframe::H4, Series::new(vec![bar(0, 9.0)]));
        assert_eq!(map.current_price(), Some(9.0));
    }

    #[test]
    fn current_price_falls_back_to_h1_only() {
        let map = SeriesByTimeframe::new()
            .with(Timeframe::M15, Series::new(vec![bar(0, 5.0)]))
            .with(Timeframe::H1, Series::new(vec![bar(0, 7.0)]));
        assert_eq!(map.current_price(), Some(7.0));

        let context_only = SeriesByTimeframe::new()
            .with(Timeframe::M5, Series::new(vec![bar(0, 2.0)]))
            .with(Timeframe::D, Series::new(vec![bar(0, 3.5)]));
        assert_eq!(context_only.current_price(), None);
        assert_eq!(SeriesByTimeframe::new().current_price(), None);
    }
}
