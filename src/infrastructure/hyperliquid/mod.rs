pub mod market_data;
pub mod types;
pub mod websocket;

pub use market_data::{HyperliquidFeed, HyperliquidFeedBuilder};
pub use websocket::HyperliquidWebSocketManager;
