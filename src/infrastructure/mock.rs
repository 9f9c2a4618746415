use crate::domain::market::{Candle, CandleInterval};
use crate::domain::ports::CandleFeed;
use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{
    RwLock,
    mpsc::{self, Receiver, Sender},
};
use tracing::{debug, info};

#[derive(Default)]
struct MockState {
    histories: RwLock<HashMap<String, Vec<Candle>>>,
    subscribers: RwLock<HashMap<String, Vec<Sender<Candle>>>>,
    simulated: RwLock<HashSet<String>>,
    failing_fetches: AtomicU32,
    fetch_latency_ms: AtomicU64,
    fetches: AtomicUsize,
    subscriptions: AtomicUsize,
}

/// In-process candle feed for tests and offline runs.
///
/// Histories are generated on first request unless set explicitly. With a
/// simulation tick, every subscribed symbol receives a new bar per tick.
#[derive(Clone, Default)]
pub struct MockCandleFeed {
    state: Arc<MockState>,
    simulation_tick: Option<Duration>,
}

impl MockCandleFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_simulation(tick: Duration) -> Self {
        Self {
            state: Arc::default(),
            simulation_tick: Some(tick),
        }
    }

    pub async fn set_history(&self, symbol: &str, candles: Vec<Candle>) {
        self.state
            .histories
            .write()
            .await
            .insert(symbol.to_string(), candles);
    }

    /// Fail the next `count` snapshot requests.
    pub fn fail_next_fetches(&self, count: u32) {
        self.state.failing_fetches.store(count, Ordering::SeqCst);
    }

    /// Hold every later snapshot request on its worker thread for `latency`.
    pub fn set_fetch_latency(&self, latency: Duration) {
        self.state
            .fetch_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    pub fn subscription_count(&self) -> usize {
        self.state.subscriptions.load(Ordering::SeqCst)
    }

    pub async fn subscriber_count(&self, symbol: &str) -> usize {
        self.state
            .subscribers
            .read()
            .await
            .get(symbol)
            .map_or(0, |subs| subs.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// Push a candle to live subscribers and record it in the symbol's history.
    /// Returns the number of subscribers reached.
    pub async fn publish(&self, symbol: &str, candle: Candle) -> usize {
        {
            let mut histories = self.state.histories.write().await;
            let history = histories.entry(symbol.to_string()).or_default();
            match history.last_mut() {
                Some(last) if last.open_time == candle.open_time => *last = candle,
                Some(last) if last.open_time > candle.open_time => {}
                _ => history.push(candle),
            }
        }

        let mut subscribers = self.state.subscribers.write().await;
        let Some(subs) = subscribers.get_mut(symbol) else {
            return 0;
        };

        let mut active = Vec::with_capacity(subs.len());
        for tx in subs.iter() {
            if tx.send(candle).await.is_ok() {
                active.push(tx.clone());
            }
        }
        *subs = active;
        subs.len()
    }

    /// Close every live stream of `symbol`, as a dropped connection would.
    pub async fn disconnect(&self, symbol: &str) {
        if let Some(subs) = self.state.subscribers.write().await.remove(symbol) {
            info!(
                "MockCandleFeed: dropped {} streams for {}",
                subs.len(),
                symbol
            );
        }
    }

    pub async fn disconnect_all(&self) {
        self.state.subscribers.write().await.clear();
    }

    fn spawn_simulation(&self, symbol: String, interval: CandleInterval, tick: Duration) {
        let feed = self.clone();
        tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed_for(&symbol));
            let mut ticker = tokio::time::interval(tick);
            ticker.tick().await;
            info!("MockCandleFeed: starting price simulation for {}", symbol);

            loop {
                ticker.tick().await;
                let last = feed
                    .state
                    .histories
                    .read()
                    .await
                    .get(&symbol)
                    .and_then(|h| h.last().copied());
                let Some(last) = last else {
                    break;
                };

                let next = next_candle(&last, interval, &mut rng);
                if feed.publish(&symbol, next).await == 0 {
                    debug!("MockCandleFeed: no subscribers left for {}", symbol);
                    break;
                }
            }
            feed.state.simulated.write().await.remove(&symbol);
        });
    }
}

fn seed_for(symbol: &str) -> u64 {
    symbol
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325, |acc, b| (acc ^ b as u64).wrapping_mul(0x100_0000_01b3))
}

fn base_price(symbol: &str) -> f64 {
    if symbol.contains("BTC") {
        96000.0
    } else if symbol.contains("ETH") {
        3400.0
    } else if symbol.contains("SOL") {
        150.0
    } else {
        40.0
    }
}

fn next_candle(previous: &Candle, interval: CandleInterval, rng: &mut StdRng) -> Candle {
    let step = interval.duration_ms();
    let open = previous.close;
    let close = open * (1.0 + rng.random_range(-0.005..0.005));
    let wick = open.max(close) * rng.random_range(0.0..0.002);
    Candle {
        open_time: previous.open_time + step,
        close_time: previous.open_time + 2 * step - 1,
        open,
        high: open.max(close) + wick,
        low: open.min(close) - wick,
        close,
        volume: rng.random_range(10.0..1_000.0),
    }
}

/// Deterministic random walk of `count` bars, the last one opening at `end_open_time`.
pub fn synthetic_history(
    symbol: &str,
    interval: CandleInterval,
    count: usize,
    end_open_time: i64,
) -> Vec<Candle> {
    if count == 0 {
        return Vec::new();
    }
    let step = interval.duration_ms();
    let start = end_open_time - step * (count as i64 - 1);
    let price = base_price(symbol);
    let mut rng = StdRng::seed_from_u64(seed_for(symbol));

    let mut candles = Vec::with_capacity(count);
    let mut previous = Candle {
        open_time: start - step,
        close_time: start - 1,
        open: price,
        high: price,
        low: price,
        close: price,
        volume: 0.0,
    };
    for _ in 0..count {
        previous = next_candle(&previous, interval, &mut rng);
        candles.push(previous);
    }
    candles
}

#[async_trait]
impl CandleFeed for MockCandleFeed {
    async fn fetch_snapshot(
        &self,
        symbol: &str,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.state.fetches.fetch_add(1, Ordering::SeqCst);

        let latency = self.state.fetch_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            std::thread::sleep(Duration::from_millis(latency));
        }

        let failing = self.state.failing_fetches.load(Ordering::SeqCst);
        if failing > 0 {
            self.state
                .failing_fetches
                .store(failing - 1, Ordering::SeqCst);
            anyhow::bail!("MockCandleFeed: injected snapshot failure for {}", symbol);
        }

        let mut histories = self.state.histories.write().await;
        let history = histories.entry(symbol.to_string()).or_insert_with(|| {
            let now = chrono::Utc::now().timestamp_millis();
            let step = interval.duration_ms();
            synthetic_history(symbol, interval, limit, now - now.rem_euclid(step))
        });

        let skip = history.len().saturating_sub(limit);
        Ok(history[skip..].to_vec())
    }

    async fn subscribe(&self, symbol: &str, interval: CandleInterval) -> Result<Receiver<Candle>> {
        let (tx, rx) = mpsc::channel(100);
        {
            let mut subscribers = self.state.subscribers.write().await;
            let subs = subscribers.entry(symbol.to_string()).or_default();
            subs.retain(|tx| !tx.is_closed());
            subs.push(tx);
        }
        self.state.subscriptions.fetch_add(1, Ordering::SeqCst);

        if let Some(tick) = self.simulation_tick {
            if self.state.simulated.write().await.insert(symbol.to_string()) {
                self.spawn_simulation(symbol.to_string(), interval, tick);
            }
        }
        Ok(rx)
    }

    async fn unsubscribe(&self, symbol: &str, _interval: CandleInterval) -> Result<()> {
        self.state.subscribers.write().await.remove(symbol);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_history_is_contiguous_and_deterministic() {
        let a = synthetic_history("BTC", CandleInterval::OneMinute, 50, 3_000_000);
        let b = synthetic_history("BTC", CandleInterval::OneMinute, 50, 3_000_000);
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert_eq!(a.last().unwrap().open_time, 3_000_000);
        assert!(a.windows(2).all(|w| w[1].open_time - w[0].open_time == 60_000));
        assert!(a.iter().all(|c| c.is_well_formed() && c.low <= c.high));
    }

    #[tokio::test]
    async fn test_injected_failures_then_success() {
        let feed = MockCandleFeed::new();
        feed.fail_next_fetches(2);

        assert!(feed.fetch_snapshot("ETH", CandleInterval::OneMinute, 10).await.is_err());
        assert!(feed.fetch_snapshot("ETH", CandleInterval::OneMinute, 10).await.is_err());
        let candles = feed
            .fetch_snapshot("ETH", CandleInterval::OneMinute, 10)
            .await
            .unwrap();
        assert_eq!(candles.len(), 10);
        assert_eq!(feed.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers_and_history() {
        let feed = MockCandleFeed::new();
        feed.set_history("BTC", synthetic_history("BTC", CandleInterval::OneMinute, 5, 240_000))
            .await;
        let mut rx = feed.subscribe("BTC", CandleInterval::OneMinute).await.unwrap();

        let history = feed.fetch_snapshot("BTC", CandleInterval::OneMinute, 10).await.unwrap();
        let mut next = *history.last().unwrap();
        next.open_time += 60_000;
        next.close_time += 60_000;

        assert_eq!(feed.publish("BTC", next).await, 1);
        assert_eq!(rx.recv().await, Some(next));

        let history = feed.fetch_snapshot("BTC", CandleInterval::OneMinute, 10).await.unwrap();
        assert_eq!(history.len(), 6);

        feed.disconnect("BTC").await;
        assert_eq!(rx.recv().await, None);
    }
}
