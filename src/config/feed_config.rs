//! Feed configuration parsing from environment variables.

use super::{Lookup, parse_var};
use crate::domain::market::CandleInterval;
use anyhow::{Context, Result};
use std::str::FromStr;
use url::Url;

pub const MAINNET_INFO_URL: &str = "https://api.hyperliquid.xyz/info";
pub const MAINNET_WS_URL: &str = "wss://api.hyperliquid.xyz/ws";
pub const TESTNET_INFO_URL: &str = "https://api.hyperliquid-testnet.xyz/info";
pub const TESTNET_WS_URL: &str = "wss://api.hyperliquid-testnet.xyz/ws";

/// Where candles come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    Hyperliquid,
    Mock,
}

impl FromStr for FeedMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hyperliquid" => Ok(FeedMode::Hyperliquid),
            "mock" => Ok(FeedMode::Mock),
            _ => anyhow::bail!("Invalid FEED_MODE: {}. Must be 'hyperliquid' or 'mock'", s),
        }
    }
}

/// Feed environment configuration
#[derive(Debug, Clone)]
pub struct FeedEnvConfig {
    pub mode: FeedMode,
    pub symbols: Vec<String>,
    pub interval: CandleInterval,
    /// Capacity of each symbol's candle window, also the snapshot size.
    pub max_candles: usize,
    pub testnet: bool,
    pub info_url: Url,
    pub ws_url: Url,
}

impl FeedEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let mode = lookup("FEED_MODE")
            .unwrap_or_else(|| "hyperliquid".to_string())
            .parse::<FeedMode>()?;

        let symbols: Vec<String> = lookup("SYMBOLS")
            .unwrap_or_else(|| "BTC,ETH".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            anyhow::bail!("SYMBOLS must list at least one symbol");
        }

        let interval = lookup("CANDLE_INTERVAL")
            .unwrap_or_else(|| "1m".to_string())
            .trim()
            .parse::<CandleInterval>()
            .context("Failed to parse CANDLE_INTERVAL")?;

        let testnet = parse_var(lookup, "TEST_NET", false)?;
        let (default_info, default_ws) = if testnet {
            (TESTNET_INFO_URL, TESTNET_WS_URL)
        } else {
            (MAINNET_INFO_URL, MAINNET_WS_URL)
        };

        let info_url = parse_url(lookup, "HYPERLIQUID_INFO_URL", default_info)?;
        let ws_url = parse_url(lookup, "HYPERLIQUID_WS_URL", default_ws)?;

        Ok(Self {
            mode,
            symbols,
            interval,
            max_candles: parse_var(lookup, "MAX_CANDLES", 500)?,
            testnet,
            info_url,
            ws_url,
        })
    }
}

fn parse_url(lookup: Lookup<'_>, key: &str, default: &str) -> Result<Url> {
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    Url::parse(raw.trim()).with_context(|| format!("Failed to parse {} as URL", key))
}
