use super::{Lookup, parse_var};
use anyhow::Result;
use std::net::SocketAddr;

/// RPC listener configuration
#[derive(Debug, Clone)]
pub struct RpcEnvConfig {
    pub bind_address: SocketAddr,
}

impl RpcEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        Ok(Self {
            bind_address: parse_var(
                lookup,
                "RPC_BIND_ADDRESS",
                SocketAddr::from(([127, 0, 0, 1], 7878)),
            )?,
        })
    }
}
