mod common;

use common::*;
use inferno::application::market_data::CandleStore;
use inferno::domain::errors::SignalError;
use proptest::prelude::*;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshots_stay_consistent_under_concurrent_merges() {
    // 1. Store seeded with a short history
    let store = Arc::new(CandleStore::new(50));
    store.initialize("BTC", rising(10, 100.0)).unwrap();

    // 2. Writer appends 2000 bars, replacing each once before moving on
    let writer_store = store.clone();
    let writer = tokio::spawn(async move {
        for i in 10..2_010i64 {
            let close = 100.0 + i as f64;
            writer_store.merge("BTC", candle(i, close - 0.5)).unwrap();
            writer_store.merge("BTC", candle(i, close)).unwrap();
            if i % 100 == 0 {
                tokio::task::yield_now().await;
            }
        }
    });

    // 3. Readers check every snapshot they see
    let mut readers = Vec::new();
    for _ in 0..4 {
        let reader_store = store.clone();
        readers.push(tokio::spawn(async move {
            let mut seen = 0;
            for _ in 0..500 {
                let snapshot = reader_store.snapshot("BTC").unwrap();
                let candles = snapshot.candles();
                assert!(candles.len() <= 50);
                assert!(candles.windows(2).all(|w| w[0].open_time < w[1].open_time));
                seen += candles.len();
                tokio::task::yield_now().await;
            }
            seen
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        assert!(reader.await.unwrap() > 0);
    }

    // 4. Final state holds exactly the newest 50 bars
    let snapshot = store.snapshot("BTC").unwrap();
    assert_eq!(snapshot.len(), 50);
    assert_eq!(snapshot.last().unwrap().open_time, 2_009 * MINUTE);
    assert_eq!(snapshot.last().unwrap().close, 100.0 + 2_009.0);
}

#[test]
fn test_snapshot_is_isolated_from_later_merges() {
    let store = CandleStore::new(3);
    store.initialize("ETH", rising(3, 10.0)).unwrap();

    let before = store.snapshot("ETH").unwrap();
    store.merge("ETH", candle(3, 20.0)).unwrap();
    let after = store.snapshot("ETH").unwrap();

    assert_eq!(before.candles()[0].open_time, 0);
    assert_eq!(before.len(), 3);
    assert_eq!(after.candles()[0].open_time, MINUTE);
    assert_eq!(after.last().unwrap().close, 20.0);
}

#[test]
fn test_unknown_symbol_and_empty_seed() {
    let store = CandleStore::new(10);
    assert_eq!(
        store.merge("XRP", candle(0, 1.0)).unwrap_err(),
        SignalError::UnknownSymbol {
            symbol: "XRP".to_string()
        }
    );
    assert!(matches!(
        store.initialize("XRP", Vec::new()),
        Err(SignalError::DataUnavailable { .. })
    ));
}

proptest! {
    #[test]
    fn prop_window_is_ordered_and_bounded(
        capacity in 1usize..20,
        offsets in prop::collection::vec(0i64..60, 1..200),
    ) {
        let store = CandleStore::new(capacity);
        store.initialize("BTC", vec![candle(offsets[0], 1.0)]).unwrap();

        // Reference model: newest open_time wins, older updates are rejected
        let mut expected = vec![offsets[0]];
        for (i, &offset) in offsets.iter().enumerate().skip(1) {
            let result = store.merge("BTC", candle(offset, i as f64));
            let last = *expected.last().unwrap();
            if offset < last {
                let is_out_of_order = matches!(result, Err(SignalError::OutOfOrderCandle { .. }));
                prop_assert!(is_out_of_order);
            } else {
                prop_assert!(result.is_ok());
                if offset > last {
                    expected.push(offset);
                }
            }
        }
        let keep = expected.len().saturating_sub(capacity);
        let expected: Vec<i64> = expected[keep..].iter().map(|o| o * MINUTE).collect();

        let snapshot = store.snapshot("BTC").unwrap();
        let open_times: Vec<i64> = snapshot.candles().iter().map(|c| c.open_time).collect();
        prop_assert!(open_times.len() <= capacity);
        prop_assert!(open_times.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(open_times, expected);
    }
}
