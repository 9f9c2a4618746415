// Indicator features for the ML path
pub mod feature_engineering;

// Candle windows and the live feed that fills them
pub mod market_data;

pub mod ml;

pub mod risk_management;

// Technical strategies
pub mod strategies;

pub mod signal_service;

// System orchestrator
pub mod system;
