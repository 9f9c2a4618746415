use crate::domain::market::{Candle, CandleInterval};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

/// Source of candles for the store: a historical snapshot plus a live stream.
///
/// A subscription ends when the returned receiver yields `None`; the caller
/// is expected to re-seed from a fresh snapshot before subscribing again.
#[async_trait]
pub trait CandleFeed: Send + Sync {
    /// The most recent `limit` bars, oldest first.
    async fn fetch_snapshot(
        &self,
        symbol: &str,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    async fn subscribe(&self, symbol: &str, interval: CandleInterval) -> Result<Receiver<Candle>>;

    async fn unsubscribe(&self, symbol: &str, interval: CandleInterval) -> Result<()>;
}
