//! Keeps the candle store in sync with a live feed.
//!
//! Each subscribed symbol gets one background task that applies updates in
//! delivery order. When a stream ends the task backs off, re-seeds the window
//! from a fresh historical snapshot and subscribes again.

use super::CandleStore;
use crate::domain::errors::{FeedError, SignalError};
use crate::domain::market::{Candle, CandleInterval};
use crate::domain::ports::CandleFeed;
use crate::infrastructure::observability::Metrics;
use anyhow::{Context, Result};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Snapshot attempts per symbol during `start` before giving up.
    pub seed_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            seed_attempts: 3,
        }
    }
}

impl ReconnectPolicy {
    fn next_backoff(&self, current: Duration) -> Duration {
        (current * 2).min(self.max_backoff)
    }

    /// Adds up to 25% random jitter so symbols do not reconnect in lockstep.
    fn jittered(&self, backoff: Duration) -> Duration {
        let spread = backoff.as_millis() as u64 / 4;
        if spread == 0 {
            return backoff;
        }
        backoff + Duration::from_millis(rand::rng().random_range(0..=spread))
    }
}

struct FeedContext {
    feed: Arc<dyn CandleFeed>,
    store: Arc<CandleStore>,
    metrics: Metrics,
    interval: CandleInterval,
    policy: ReconnectPolicy,
}

impl FeedContext {
    async fn seed(&self, symbol: &str) -> Result<usize> {
        let limit = self.store.capacity();
        let history = self
            .feed
            .fetch_snapshot(symbol, self.interval, limit)
            .await
            .map_err(|e| FeedError::SnapshotFailed {
                symbol: symbol.to_string(),
                reason: format!("{:#}", e),
            })?;

        let (valid, malformed): (Vec<Candle>, Vec<Candle>) =
            history.into_iter().partition(|c| c.is_well_formed());
        if !malformed.is_empty() {
            warn!(
                "FeedAdapter: dropped {} malformed candles from {} snapshot",
                malformed.len(),
                symbol
            );
        }

        Ok(self.store.initialize(symbol, valid)?)
    }

    async fn seed_with_retry(&self, symbol: &str) -> Result<usize> {
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.seed(symbol).await {
                Ok(count) => return Ok(count),
                Err(e) if attempt < self.policy.seed_attempts => {
                    warn!(
                        "FeedAdapter: seeding {} failed (attempt {}/{}): {:#}. Retrying in {:?}",
                        symbol, attempt, self.policy.seed_attempts, e, backoff
                    );
                    tokio::time::sleep(self.policy.jittered(backoff)).await;
                    backoff = self.policy.next_backoff(backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fresh snapshot then a new subscription.
    async fn resync(&self, symbol: &str) -> Result<Receiver<Candle>> {
        let count = self.seed(symbol).await?;
        let receiver = self.feed.subscribe(symbol, self.interval).await?;
        info!(
            "FeedAdapter: {} re-seeded with {} candles and resubscribed",
            symbol, count
        );
        Ok(receiver)
    }

    fn apply(&self, symbol: &str, candle: Candle) {
        if !candle.is_well_formed() {
            warn!(
                "FeedAdapter: {}",
                FeedError::MalformedCandle {
                    symbol: symbol.to_string(),
                    reason: format!("{:?}", candle),
                }
            );
            self.metrics.inc_rejected(symbol);
            return;
        }

        match self.store.merge(symbol, candle) {
            Ok(_) => self.metrics.inc_candle_updates(symbol),
            Err(e @ SignalError::OutOfOrderCandle { .. }) => {
                warn!("FeedAdapter: {}", e);
                self.metrics.inc_rejected(symbol);
            }
            Err(e) => debug!("FeedAdapter: dropping update: {}", e),
        }
    }

    async fn run_symbol(self: Arc<Self>, symbol: String, mut receiver: Receiver<Candle>) {
        loop {
            while let Some(candle) = receiver.recv().await {
                self.apply(&symbol, candle);
            }

            warn!(
                "FeedAdapter: {}",
                FeedError::ConnectionLost {
                    reason: format!("{} candle stream closed", symbol),
                }
            );

            let mut backoff = self.policy.initial_backoff;
            receiver = loop {
                tokio::time::sleep(self.policy.jittered(backoff)).await;
                match self.resync(&symbol).await {
                    Ok(receiver) => break receiver,
                    Err(e) => {
                        error!(
                            "FeedAdapter: reconnect for {} failed: {:#}. Retrying in {:?}",
                            symbol,
                            e,
                            self.policy.next_backoff(backoff)
                        );
                        backoff = self.policy.next_backoff(backoff);
                    }
                }
            };
            self.metrics.inc_reconnects(&symbol);
        }
    }
}

/// Lifecycle owner of the per-symbol feed tasks.
pub struct FeedAdapter {
    context: Arc<FeedContext>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl FeedAdapter {
    pub fn new(
        feed: Arc<dyn CandleFeed>,
        store: Arc<CandleStore>,
        metrics: Metrics,
        interval: CandleInterval,
    ) -> Self {
        Self::with_policy(feed, store, metrics, interval, ReconnectPolicy::default())
    }

    pub fn with_policy(
        feed: Arc<dyn CandleFeed>,
        store: Arc<CandleStore>,
        metrics: Metrics,
        interval: CandleInterval,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            context: Arc::new(FeedContext {
                feed,
                store,
                metrics,
                interval,
                policy,
            }),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Seed and subscribe every symbol. A symbol that cannot be seeded aborts startup.
    pub async fn start(&self, symbols: &[String]) -> Result<()> {
        info!(
            "FeedAdapter: starting {} symbols at {}",
            symbols.len(),
            self.context.interval
        );
        for symbol in symbols {
            self.subscribe_symbol(symbol).await?;
        }
        Ok(())
    }

    pub async fn subscribe_symbol(&self, symbol: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(symbol) {
            debug!("FeedAdapter: {} already subscribed", symbol);
            return Ok(());
        }

        let count = self
            .context
            .seed_with_retry(symbol)
            .await
            .with_context(|| format!("Failed to seed candle history for {}", symbol))?;
        let receiver = self
            .context
            .feed
            .subscribe(symbol, self.context.interval)
            .await
            .with_context(|| format!("Failed to subscribe to {} candles", symbol))?;

        let handle = tokio::spawn(
            self.context
                .clone()
                .run_symbol(symbol.to_string(), receiver),
        );
        tasks.insert(symbol.to_string(), handle);
        self.context
            .metrics
            .tracked_symbols
            .set(self.context.store.symbols().len() as f64);

        info!("FeedAdapter: {} live with {} seeded candles", symbol, count);
        Ok(())
    }

    pub async fn unsubscribe_symbol(&self, symbol: &str) -> Result<()> {
        let handle = self.tasks.lock().await.remove(symbol);
        let Some(handle) = handle else {
            return Err(FeedError::NotSubscribed {
                symbol: symbol.to_string(),
                interval: self.context.interval.to_string(),
            }
            .into());
        };

        // The task may be mid-resync on another worker; it must be gone
        // before the window is dropped or it would seed it again.
        handle.abort();
        let _ = handle.await;
        self.context.store.remove(symbol);
        self.context
            .metrics
            .tracked_symbols
            .set(self.context.store.symbols().len() as f64);

        self.context
            .feed
            .unsubscribe(symbol, self.context.interval)
            .await
            .with_context(|| format!("Failed to unsubscribe from {}", symbol))?;
        info!("FeedAdapter: {} unsubscribed", symbol);
        Ok(())
    }

    /// Stop every feed task. Unsubscribe failures are logged, not returned.
    pub async fn stop(&self) {
        let symbols = self.active_symbols().await;
        for symbol in symbols {
            if let Err(e) = self.unsubscribe_symbol(&symbol).await {
                warn!("FeedAdapter: {:#}", e);
            }
        }
        info!("FeedAdapter: stopped");
    }

    pub async fn active_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.tasks.lock().await.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}
