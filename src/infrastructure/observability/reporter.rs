//! Push-based metrics reporter for Inferno
//!
//! Periodically outputs metrics as structured JSON to stdout.
//! This system only SENDS data, never accepts requests.

use crate::application::market_data::CandleStore;
use crate::application::ml::{ModelInferenceEngine, ModelMetadata};
use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub symbols: Vec<SymbolSnapshot>,
    pub model: ModelMetadata,
    pub requests: RequestSnapshot,
}

#[derive(Serialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub candles: usize,
    pub last_open_time: Option<i64>,
    pub last_close: Option<f64>,
    pub updates: u64,
    pub rejected: u64,
    pub reconnects: u64,
}

#[derive(Serialize)]
pub struct RequestSnapshot {
    pub technical_success: u64,
    pub technical_failure: u64,
    pub ml_success: u64,
    pub ml_failure: u64,
    pub rejected: u64,
}

/// Push-based metrics reporter
///
/// Outputs metrics as structured JSON logs on a configurable interval.
pub struct MetricsReporter {
    store: Arc<CandleStore>,
    model: Arc<ModelInferenceEngine>,
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(
        store: Arc<CandleStore>,
        model: Arc<ModelInferenceEngine>,
        metrics: Metrics,
        interval_seconds: u64,
    ) -> Self {
        Self {
            store,
            model,
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Run the reporter in a loop, outputting metrics periodically
    pub async fn run(self) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = self.collect_snapshot();
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    // Prefix lets log shippers filter metric lines
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Symbols: {} | Requests ok: {} | Uptime: {}s",
                        snapshot.symbols.len(),
                        snapshot.requests.technical_success + snapshot.requests.ml_success,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
        }
    }

    fn collect_snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();

        let symbols: Vec<SymbolSnapshot> = self
            .store
            .symbols()
            .into_iter()
            .filter_map(|symbol| {
                let window = self.store.snapshot(&symbol).ok()?;
                let last = window.last().copied();
                Some(SymbolSnapshot {
                    candles: window.len(),
                    last_open_time: last.map(|c| c.open_time),
                    last_close: last.map(|c| c.close),
                    updates: self.metrics.candle_updates(&symbol),
                    rejected: self.metrics.rejected(&symbol),
                    reconnects: self.metrics.reconnects(&symbol),
                    symbol,
                })
            })
            .collect();

        self.metrics.tracked_symbols.set(symbols.len() as f64);
        self.metrics.uptime_seconds.set(uptime as f64);

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            symbols,
            model: self.model.metadata(),
            requests: RequestSnapshot {
                technical_success: self.metrics.requests("TECHNICAL", "success"),
                technical_failure: self.metrics.requests("TECHNICAL", "failure"),
                ml_success: self.metrics.requests("ML", "success"),
                ml_failure: self.metrics.requests("ML", "failure"),
                rejected: self.metrics.requests("UNKNOWN", "failure"),
            },
        }
    }
}
