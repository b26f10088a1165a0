pub mod candle;
pub mod oanda;
pub mod source;

pub use candle::{Candle, Series, SeriesByTimeframe};
pub use oanda::OandaClient;
pub use source::CandleSource;
