//! Observability configuration parsing from environment variables.
//!
//! This module handles loading monitoring and metrics configuration.

use super::{Lookup, parse_var};
use anyhow::Result;

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    /// Seconds between two metrics snapshots.
    pub interval_secs: u64,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let interval_secs = parse_var(lookup, "OBSERVABILITY_INTERVAL", 60u64)?;
        if interval_secs == 0 {
            anyhow::bail!("OBSERVABILITY_INTERVAL must be > 0");
        }
        Ok(Self {
            enabled: parse_var(lookup, "OBSERVABILITY_ENABLED", true)?,
            interval_secs,
        })
    }
}
