//! Prometheus metrics definitions for the signal core
//!
//! All metrics use the `inferno_` prefix and are read-only.

use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the signal pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Signal requests by mode (TECHNICAL/ML) and outcome (success/failure)
    pub signal_requests_total: CounterVec,
    /// Candle updates merged into the store, per symbol
    pub candle_updates_total: CounterVec,
    /// Candle updates rejected by the store, per symbol
    pub candles_rejected_total: CounterVec,
    /// Feed re-subscriptions after a lost stream, per symbol
    pub feed_reconnects_total: CounterVec,
    /// Time spent deriving features and running the model
    pub inference_latency_seconds: Histogram,
    /// Symbols currently held in the candle store
    pub tracked_symbols: GenericGauge<AtomicF64>,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let signal_requests_total = CounterVec::new(
            Opts::new(
                "inferno_signal_requests_total",
                "Signal requests by mode and outcome",
            ),
            &["mode", "outcome"],
        )?;
        registry.register(Box::new(signal_requests_total.clone()))?;

        let candle_updates_total = CounterVec::new(
            Opts::new(
                "inferno_candle_updates_total",
                "Candle updates merged into the store",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(candle_updates_total.clone()))?;

        let candles_rejected_total = CounterVec::new(
            Opts::new(
                "inferno_candles_rejected_total",
                "Candle updates rejected as out of order",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(candles_rejected_total.clone()))?;

        let feed_reconnects_total = CounterVec::new(
            Opts::new(
                "inferno_feed_reconnects_total",
                "Feed re-subscriptions after a lost stream",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(feed_reconnects_total.clone()))?;

        let inference_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "inferno_inference_latency_seconds",
                "Feature derivation plus model inference latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
            ]),
        )?;
        registry.register(Box::new(inference_latency_seconds.clone()))?;

        let tracked_symbols = Gauge::with_opts(Opts::new(
            "inferno_tracked_symbols",
            "Symbols currently held in the candle store",
        ))?;
        registry.register(Box::new(tracked_symbols.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "inferno_uptime_seconds",
            "Server uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            signal_requests_total,
            candle_updates_total,
            candles_rejected_total,
            feed_reconnects_total,
            inference_latency_seconds,
            tracked_symbols,
            uptime_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_requests(&self, mode: &str, outcome: &str) {
        self.signal_requests_total
            .with_label_values(&[mode, outcome])
            .inc();
    }

    pub fn inc_candle_updates(&self, symbol: &str) {
        self.candle_updates_total.with_label_values(&[symbol]).inc();
    }

    pub fn inc_rejected(&self, symbol: &str) {
        self.candles_rejected_total
            .with_label_values(&[symbol])
            .inc();
    }

    /// Increment feed reconnects
    pub fn inc_reconnects(&self, symbol: &str) {
        self.feed_reconnects_total
            .with_label_values(&[symbol])
            .inc();
    }

    pub fn observe_inference_latency(&self, seconds: f64) {
        self.inference_latency_seconds.observe(seconds);
    }

    pub fn requests(&self, mode: &str, outcome: &str) -> u64 {
        self.signal_requests_total
            .with_label_values(&[mode, outcome])
            .get() as u64
    }

    pub fn candle_updates(&self, symbol: &str) -> u64 {
        self.candle_updates_total.with_label_values(&[symbol]).get() as u64
    }

    pub fn rejected(&self, symbol: &str) -> u64 {
        self.candles_rejected_total
            .with_label_values(&[symbol])
            .get() as u64
    }

    pub fn reconnects(&self, symbol: &str) -> u64 {
        self.feed_reconnects_total
            .with_label_values(&[symbol])
            .get() as u64
    }
}
