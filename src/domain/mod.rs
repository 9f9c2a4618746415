// Candles, windows and strategy parameters
pub mod market;

// Model artifact schema and feature contract
pub mod ml;

// Port interfaces
pub mod ports;

// Request/response value objects
pub mod signal;

// Domain-specific error types
pub mod errors;
