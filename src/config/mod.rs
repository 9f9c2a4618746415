//! Configuration module for the signal core.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Strategy, Feed, Model, RPC, and Observability.
//!
//! Every loader has a `from_lookup` variant taking the variable source as a
//! closure, so configurations can be built without touching the process env.

mod feed_config;
mod model_config;
mod observability_config;
mod rpc_config;
mod strategy_config;

pub use feed_config::{FeedEnvConfig, FeedMode};
pub use model_config::ModelEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use rpc_config::RpcEnvConfig;
pub use strategy_config::StrategyEnvConfig;

use crate::application::feature_engineering::MIN_HISTORY;
use crate::domain::market::StrategyConfig;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Source of configuration values, keyed by variable name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Parse `key` with `FromStr`, falling back to `default` when unset.
pub(crate) fn parse_var<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: StrategyConfig,
    pub feed: FeedEnvConfig,
    pub model: ModelEnvConfig,
    pub rpc: RpcEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let strategy = StrategyEnvConfig::from_lookup(lookup)
            .context("Failed to load strategy config")?
            .strategy;
        let feed = FeedEnvConfig::from_lookup(lookup).context("Failed to load feed config")?;
        let model = ModelEnvConfig::from_lookup(lookup);
        let rpc = RpcEnvConfig::from_lookup(lookup).context("Failed to load RPC config")?;
        let observability = ObservabilityEnvConfig::from_lookup(lookup)
            .context("Failed to load observability config")?;

        let config = Self {
            strategy,
            feed,
            model,
            rpc,
            observability,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-section checks that no single sub-config can make on its own.
    fn validate(&self) -> Result<()> {
        let required = MIN_HISTORY.max(self.strategy.largest_window());
        if self.feed.max_candles < required {
            anyhow::bail!(
                "MAX_CANDLES must be at least {} (feature history and largest look-back window), got {}",
                required,
                self.feed.max_candles
            );
        }
        Ok(())
    }
}
