use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::market_data::{CandleStore, FeedAdapter};
use crate::application::ml::ModelInferenceEngine;
use crate::application::signal_service::SignalService;
use crate::application::strategies::DonchianStrategy;
use crate::config::{Config, FeedMode};
use crate::domain::ports::CandleFeed;
use crate::infrastructure::hyperliquid::HyperliquidFeed;
use crate::infrastructure::mock::MockCandleFeed;
use crate::infrastructure::observability::Metrics;

/// Bar cadence of the offline mock feed.
const MOCK_TICK: Duration = Duration::from_secs(1);

/// Running system returned by [`Application::start`].
pub struct SystemHandle {
    pub service: Arc<SignalService>,
    pub store: Arc<CandleStore>,
    pub model: Arc<ModelInferenceEngine>,
    pub feed_adapter: Arc<FeedAdapter>,
    pub metrics: Metrics,
}

impl SystemHandle {
    /// Stop every feed task and drop the tracked windows.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.feed_adapter.stop().await;
        info!("Shutdown sequence completed.");
    }
}

pub struct Application {
    pub config: Config,
    pub store: Arc<CandleStore>,
    pub model: Arc<ModelInferenceEngine>,
    pub feed_adapter: Arc<FeedAdapter>,
    pub service: Arc<SignalService>,
    pub metrics: Metrics,
}

impl Application {
    /// Wire the configured feed. A model that cannot be loaded is fatal.
    pub async fn build(config: Config) -> Result<Self> {
        info!("Building Inferno Application (Feed: {:?})...", config.feed.mode);

        let feed: Arc<dyn CandleFeed> = match config.feed.mode {
            FeedMode::Mock => {
                info!("Using mock candle feed");
                Arc::new(MockCandleFeed::with_simulation(MOCK_TICK))
            }
            FeedMode::Hyperliquid => {
                info!(
                    "Using Hyperliquid feed ({})",
                    if config.feed.testnet { "testnet" } else { "mainnet" }
                );
                Arc::new(
                    HyperliquidFeed::builder()
                        .info_url(config.feed.info_url.as_str())
                        .ws_url(config.feed.ws_url.as_str())
                        .build()?,
                )
            }
        };

        let model_path = config.model.path();
        let model = ModelInferenceEngine::load(&model_path)
            .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

        Self::from_parts(config, feed, model)
    }

    /// Wire the system around an already constructed feed and model.
    pub fn from_parts(
        config: Config,
        feed: Arc<dyn CandleFeed>,
        model: ModelInferenceEngine,
    ) -> Result<Self> {
        let metrics = Metrics::new().context("Failed to create metrics registry")?;
        let store = Arc::new(CandleStore::new(config.feed.max_candles));
        let model = Arc::new(model);
        let strategy = Arc::new(DonchianStrategy::new(Arc::new(config.strategy.clone())));

        let feed_adapter = Arc::new(FeedAdapter::new(
            feed,
            store.clone(),
            metrics.clone(),
            config.feed.interval,
        ));
        let service = Arc::new(SignalService::new(
            store.clone(),
            strategy,
            model.clone(),
            metrics.clone(),
        ));

        Ok(Self {
            config,
            store,
            model,
            feed_adapter,
            service,
            metrics,
        })
    }

    pub async fn start(self) -> Result<SystemHandle> {
        info!(
            "Starting feed for {:?} at {}...",
            self.config.feed.symbols, self.config.feed.interval
        );
        self.feed_adapter
            .start(&self.config.feed.symbols)
            .await
            .context("Failed to start candle feed")?;

        Ok(SystemHandle {
            service: self.service,
            store: self.store,
            model: self.model,
            feed_adapter: self.feed_adapter,
            metrics: self.metrics,
        })
    }
}
