#![allow(dead_code)]

use inferno::application::market_data::CandleStore;
use inferno::application::ml::ModelInferenceEngine;
use inferno::application::signal_service::SignalService;
use inferno::application::strategies::DonchianStrategy;
use inferno::domain::market::{Candle, StrategyConfig};
use inferno::domain::ml::{ClassifierParams, FEATURE_NAMES, ModelArtifact, ScalerParams};
use inferno::infrastructure::observability::Metrics;
use std::sync::Arc;
use std::time::Duration;

pub const MINUTE: i64 = 60_000;

pub fn candle(index: i64, close: f64) -> Candle {
    Candle {
        open_time: index * MINUTE,
        close_time: (index + 1) * MINUTE - 1,
        open: close,
        high: close,
        low: close,
        close,
        volume: 100.0,
    }
}

/// Closes `start, start + 1, ...`, one per minute.
pub fn rising(n: usize, start: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = start + i as f64;
            Candle {
                open: close - 0.5,
                high: close + 0.25,
                low: close - 0.75,
                ..candle(i as i64, close)
            }
        })
        .collect()
}

pub fn flat(n: usize, price: f64) -> Vec<Candle> {
    (0..n).map(|i| candle(i as i64, price)).collect()
}

/// Deterministic zig-zag walk with well-formed bars.
pub fn walk(n: usize) -> Vec<Candle> {
    let mut price: f64 = 100.0;
    (0..n)
        .map(|i| {
            let step = ((i * 7919) % 13) as f64 / 13.0 - 0.48;
            let open = price;
            price *= 1.0 + step * 0.01;
            Candle {
                open,
                high: open.max(price) * 1.002,
                low: open.min(price) * 0.998,
                volume: if i == 0 { 1e6 } else { 50.0 + (i % 5) as f64 * 10.0 },
                ..candle(i as i64, price)
            }
        })
        .collect()
}

/// Logistic model over every registered feature with zero weights, so the
/// probability is `sigmoid(intercept)` whatever the row.
pub fn constant_artifact(intercept: f64, threshold: f64) -> ModelArtifact {
    let n = FEATURE_NAMES.len();
    ModelArtifact {
        version: Some("fixture".to_string()),
        features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        scaler: ScalerParams {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        },
        classifier: ClassifierParams::Logistic {
            coefficients: vec![0.0; n],
            intercept,
        },
        threshold,
    }
}

pub fn strategy_config(windows: &[usize]) -> StrategyConfig {
    StrategyConfig {
        look_back_windows: windows.to_vec(),
        ..StrategyConfig::default()
    }
    .validated()
    .expect("valid strategy config")
}

pub fn service_with(
    capacity: usize,
    windows: &[usize],
    artifact: ModelArtifact,
) -> (SignalService, Metrics) {
    let metrics = Metrics::new().expect("Failed to create metrics");
    let service = SignalService::new(
        Arc::new(CandleStore::new(capacity)),
        Arc::new(DonchianStrategy::new(Arc::new(strategy_config(windows)))),
        Arc::new(ModelInferenceEngine::from_artifact(artifact).expect("valid artifact")),
        metrics.clone(),
    );
    (service, metrics)
}

pub fn service(windows: &[usize]) -> SignalService {
    service_with(500, windows, constant_artifact(1.0, 0.5)).0
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
