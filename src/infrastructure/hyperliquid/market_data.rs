//! Hyperliquid candle feed
//!
//! Historical bars come from the `candleSnapshot` info request, live bars
//! from the `candle` websocket channel.

use super::types::{WireCandle, candle_snapshot_body};
use super::websocket::HyperliquidWebSocketManager;
use crate::domain::market::{Candle, CandleInterval};
use crate::domain::ports::CandleFeed;
use crate::infrastructure::core::HttpClientFactory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest_middleware::ClientWithMiddleware;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

pub struct HyperliquidFeed {
    client: ClientWithMiddleware,
    info_url: String,
    ws_manager: Arc<HyperliquidWebSocketManager>,
}

impl HyperliquidFeed {
    pub fn builder() -> HyperliquidFeedBuilder {
        HyperliquidFeedBuilder::default()
    }
}

#[derive(Default)]
pub struct HyperliquidFeedBuilder {
    info_url: Option<String>,
    ws_url: Option<String>,
    client: Option<ClientWithMiddleware>,
}

impl HyperliquidFeedBuilder {
    pub fn info_url(mut self, info_url: impl Into<String>) -> Self {
        self.info_url = Some(info_url.into());
        self
    }

    pub fn ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self
    }

    pub fn client(mut self, client: ClientWithMiddleware) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<HyperliquidFeed> {
        let info_url = self.info_url.context("info_url is required")?;
        let ws_url = self.ws_url.context("ws_url is required")?;
        let client = self.client.unwrap_or_else(HttpClientFactory::create_client);

        info!(
            "HyperliquidFeed: info endpoint {}, websocket {}",
            info_url, ws_url
        );

        Ok(HyperliquidFeed {
            client,
            info_url,
            ws_manager: Arc::new(HyperliquidWebSocketManager::new(ws_url)),
        })
    }
}

/// Oldest first, deduplicated by `open_time` (later entries win), at most `limit` bars.
pub(crate) fn normalize_snapshot(raw: Vec<WireCandle>, limit: usize) -> Vec<Candle> {
    let mut candles: Vec<Candle> = raw.into_iter().map(Candle::from).collect();
    candles.sort_by_key(|c| c.open_time);
    candles.reverse();
    candles.dedup_by_key(|c| c.open_time);
    candles.reverse();

    let excess = candles.len().saturating_sub(limit);
    candles.drain(..excess);
    candles
}

#[async_trait]
impl CandleFeed for HyperliquidFeed {
    async fn fetch_snapshot(
        &self,
        symbol: &str,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let (start, end) = interval.lookback_range(Utc::now().timestamp_millis(), limit);
        let body = candle_snapshot_body(symbol, interval, start, end);

        let response = self
            .client
            .post(&self.info_url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .context("Failed to fetch candle snapshot from Hyperliquid")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Hyperliquid candleSnapshot failed ({}): {}",
                status,
                error_text
            );
        }

        let raw: Vec<WireCandle> = response
            .json()
            .await
            .context("Failed to parse Hyperliquid candleSnapshot response")?;
        let received = raw.len();
        let candles = normalize_snapshot(raw, limit);

        if candles.is_empty() {
            warn!("HyperliquidFeed: empty snapshot for {} {}", symbol, interval);
        }
        debug!(
            "HyperliquidFeed: {} {} snapshot, {} received, {} kept",
            symbol,
            interval,
            received,
            candles.len()
        );
        Ok(candles)
    }

    async fn subscribe(&self, symbol: &str, interval: CandleInterval) -> Result<Receiver<Candle>> {
        self.ws_manager.subscribe(symbol, interval).await
    }

    async fn unsubscribe(&self, symbol: &str, interval: CandleInterval) -> Result<()> {
        self.ws_manager.unsubscribe(symbol, interval).await
    }
}
