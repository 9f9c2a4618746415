pub mod candle;
pub mod candle_window;
pub mod interval;
pub mod strategy_config;

pub use candle::Candle;
pub use candle_window::{CandleWindow, MergeOutcome, StaleCandle};
pub use interval::CandleInterval;
pub use strategy_config::StrategyConfig;
