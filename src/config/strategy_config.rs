//! Strategy configuration parsing from environment variables.
//!
//! This module handles loading the Donchian / volatility-targeting parameters.

use super::{Lookup, parse_var};
use crate::domain::market::StrategyConfig;
use anyhow::{Context, Result};
use std::env;

/// Strategy environment configuration
#[derive(Debug, Clone)]
pub struct StrategyEnvConfig {
    pub strategy: StrategyConfig,
}

impl StrategyEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = StrategyConfig::default();

        let look_back_windows = match lookup("LOOK_BACK_WINDOWS") {
            Some(raw) => parse_windows(&raw).context("Failed to parse LOOK_BACK_WINDOWS")?,
            None => defaults.look_back_windows.clone(),
        };

        let strategy = StrategyConfig {
            look_back_windows,
            target_volatility: parse_var(lookup, "TARGET_VOLATILITY", defaults.target_volatility)?,
            max_allocation: parse_var(lookup, "MAX_ALLOCATION", defaults.max_allocation)?,
            volatility_window: parse_var(lookup, "VOLATILITY_WINDOW", defaults.volatility_window)?,
            periods_per_year: parse_var(lookup, "TRADING_DAYS_PER_YEAR", defaults.periods_per_year)?,
            risk_free_rate: parse_var(lookup, "RISK_FREE_RATE", defaults.risk_free_rate)?,
            min_signal_strength: parse_var(
                lookup,
                "MIN_SIGNAL_STRENGTH",
                defaults.min_signal_strength,
            )?,
        }
        .validated()?;

        Ok(Self { strategy })
    }
}

/// Accepts `5,10` as well as the list form `[5, 10]`.
fn parse_windows(raw: &str) -> Result<Vec<usize>> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .with_context(|| format!("Invalid look-back window '{}'", s))
        })
        .collect()
}
