mod common;

use common::*;
use inferno::application::market_data::{CandleStore, FeedAdapter, ReconnectPolicy};
use inferno::domain::errors::FeedError;
use inferno::domain::market::CandleInterval;
use inferno::infrastructure::mock::MockCandleFeed;
use inferno::infrastructure::observability::Metrics;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        seed_attempts: 3,
    }
}

fn adapter(feed: &MockCandleFeed, capacity: usize) -> (FeedAdapter, Arc<CandleStore>, Metrics) {
    let store = Arc::new(CandleStore::new(capacity));
    let metrics = Metrics::new().expect("Failed to create metrics");
    let adapter = FeedAdapter::with_policy(
        Arc::new(feed.clone()),
        store.clone(),
        metrics.clone(),
        CandleInterval::OneMinute,
        fast_policy(),
    );
    (adapter, store, metrics)
}

#[tokio::test]
async fn test_start_seeds_and_applies_live_updates() {
    // 1. Feed with 30 bars of history for one symbol
    let feed = MockCandleFeed::new();
    feed.set_history("BTC", rising(30, 100.0)).await;
    let (adapter, store, metrics) = adapter(&feed, 20);

    // 2. Start trims the snapshot to capacity
    adapter.start(&["BTC".to_string()]).await.unwrap();
    assert_eq!(store.len("BTC"), Some(20));
    assert_eq!(adapter.active_symbols().await, vec!["BTC".to_string()]);

    // 3. A live bar lands in the store
    assert_eq!(feed.publish("BTC", candle(30, 130.0)).await, 1);
    assert!(
        eventually(WAIT, || {
            store
                .snapshot("BTC")
                .map(|w| w.last().map(|c| c.open_time) == Some(30 * MINUTE))
                .unwrap_or(false)
        })
        .await
    );
    assert!(eventually(WAIT, || metrics.candle_updates("BTC") == 1).await);

    adapter.stop().await;
}

#[tokio::test]
async fn test_stale_and_malformed_updates_are_rejected() {
    let feed = MockCandleFeed::new();
    feed.set_history("ETH", rising(10, 50.0)).await;
    let (adapter, store, metrics) = adapter(&feed, 50);
    adapter.start(&["ETH".to_string()]).await.unwrap();

    let mut malformed = candle(10, 60.0);
    malformed.close = f64::NAN;
    feed.publish("ETH", malformed).await;
    feed.publish("ETH", candle(3, 1.0)).await;

    assert!(eventually(WAIT, || metrics.rejected("ETH") == 2).await);
    let snapshot = store.snapshot("ETH").unwrap();
    assert_eq!(snapshot.len(), 10);
    assert_eq!(snapshot.last().unwrap().close, 59.0);

    adapter.stop().await;
}

#[tokio::test]
async fn test_lost_stream_reseeds_and_resubscribes() {
    let feed = MockCandleFeed::new();
    feed.set_history("SOL", rising(15, 10.0)).await;
    let (adapter, store, metrics) = adapter(&feed, 100);
    adapter.start(&["SOL".to_string()]).await.unwrap();
    assert_eq!(feed.fetch_count(), 1);

    // 1. Bars published while disconnected only reach the history
    feed.disconnect("SOL").await;
    feed.publish("SOL", candle(15, 30.0)).await;

    // 2. The adapter re-seeds from a fresh snapshot, picking them up
    assert!(eventually(WAIT, || metrics.reconnects("SOL") == 1).await);
    assert!(feed.fetch_count() >= 2);
    assert_eq!(store.len("SOL"), Some(16));
    assert_eq!(feed.subscription_count(), 2);

    // 3. The new stream is live
    assert_eq!(feed.subscriber_count("SOL").await, 1);
    feed.publish("SOL", candle(16, 31.0)).await;
    assert!(eventually(WAIT, || store.len("SOL") == Some(17)).await);

    adapter.stop().await;
}

#[tokio::test]
async fn test_startup_retries_failed_snapshots() {
    let feed = MockCandleFeed::new();
    feed.set_history("BTC", rising(10, 100.0)).await;
    feed.fail_next_fetches(2);
    let (adapter, store, _) = adapter(&feed, 50);

    adapter.start(&["BTC".to_string()]).await.unwrap();
    assert_eq!(feed.fetch_count(), 3);
    assert_eq!(store.len("BTC"), Some(10));
    adapter.stop().await;
}

#[tokio::test]
async fn test_startup_fails_after_exhausting_attempts() {
    let feed = MockCandleFeed::new();
    feed.fail_next_fetches(10);
    let (adapter, store, _) = adapter(&feed, 50);

    assert!(adapter.start(&["BTC".to_string()]).await.is_err());
    assert_eq!(feed.fetch_count(), 3);
    assert!(store.symbols().is_empty());
    assert!(adapter.active_symbols().await.is_empty());
}

#[tokio::test]
async fn test_unsubscribe_drops_window() {
    let feed = MockCandleFeed::new();
    feed.set_history("BTC", rising(10, 100.0)).await;
    feed.set_history("ETH", rising(10, 50.0)).await;
    let (adapter, store, _) = adapter(&feed, 50);
    adapter
        .start(&["BTC".to_string(), "ETH".to_string()])
        .await
        .unwrap();

    adapter.unsubscribe_symbol("BTC").await.unwrap();
    assert_eq!(store.symbols(), vec!["ETH".to_string()]);
    assert_eq!(feed.subscriber_count("BTC").await, 0);

    let err = adapter.unsubscribe_symbol("BTC").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FeedError>(),
        Some(FeedError::NotSubscribed { .. })
    ));

    adapter.stop().await;
    assert!(store.symbols().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unsubscribe_during_resync_leaves_no_window() {
    // 1. Live symbol whose next snapshot stalls on a worker
    let feed = MockCandleFeed::new();
    feed.set_history("BTC", rising(10, 100.0)).await;
    let (adapter, store, _) = adapter(&feed, 50);
    adapter.start(&["BTC".to_string()]).await.unwrap();
    feed.set_fetch_latency(Duration::from_millis(300));

    // 2. Drop the stream and wait for the re-seed to be in flight
    feed.disconnect("BTC").await;
    assert!(eventually(WAIT, || feed.fetch_count() == 2).await);

    // 3. Unsubscribe while the task is still inside the fetch
    adapter.unsubscribe_symbol("BTC").await.unwrap();
    assert!(store.symbols().is_empty());

    // 4. The window does not come back once the fetch completes
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(store.symbols().is_empty());
    assert!(adapter.active_symbols().await.is_empty());
}
