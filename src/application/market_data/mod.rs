// Market data ingestion
pub mod candle_store;
pub mod feed_adapter;

pub use candle_store::{CandleSnapshot, CandleStore};
pub use feed_adapter::{FeedAdapter, ReconnectPolicy};
