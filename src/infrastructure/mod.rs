pub mod core;
pub mod hyperliquid;
pub mod mock;
pub mod observability;
pub mod rpc;
