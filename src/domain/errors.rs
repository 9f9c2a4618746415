use thiserror::Error;

/// Errors raised by the signal pipeline (store, strategy, features, model).
///
/// None of these are retried by the component that raises them; the
/// `SignalService` turns every variant into a `success = false` response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("Unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("Out-of-order candle for {symbol}: open_time {incoming} < last stored {last}")]
    OutOfOrderCandle {
        symbol: String,
        incoming: i64,
        last: i64,
    },

    #[error("Insufficient data: need {required} candles, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Insufficient history for features: need {required} candles, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Feature missing from row: {feature}")]
    FeatureMismatch { feature: String },

    #[error("Model artifact not found: {path}")]
    ArtifactNotFound { path: String },

    #[error("Unsupported model format: '{extension}' (expected .json or .toml)")]
    UnsupportedFormat { extension: String },

    #[error("Invalid model artifact: {reason}")]
    InvalidArtifact { reason: String },

    #[error("No candle data available for {symbol}")]
    DataUnavailable { symbol: String },

    #[error("Feature computation failed for {feature} at row {index}: {reason}")]
    FeatureComputation {
        feature: String,
        index: usize,
        reason: String,
    },
}

/// Errors raised while validating process-wide configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("LOOK_BACK_WINDOWS must contain at least one window")]
    EmptyLookBackWindows,

    #[error("Look-back windows must be positive, got {0}")]
    NonPositiveWindow(usize),

    #[error("TARGET_VOLATILITY must be > 0, got {0}")]
    InvalidTargetVolatility(f64),

    #[error("MAX_ALLOCATION must be in (0, 1], got {0}")]
    InvalidMaxAllocation(f64),

    #[error("VOLATILITY_WINDOW must be > 0, got {0}")]
    InvalidVolatilityWindow(usize),

    #[error("TRADING_DAYS_PER_YEAR must be > 0, got {0}")]
    InvalidPeriodsPerYear(u32),

    #[error("RISK_FREE_RATE must be finite, got {0}")]
    InvalidRiskFreeRate(f64),

    #[error("MIN_SIGNAL_STRENGTH must be >= 0, got {0}")]
    InvalidMinSignalStrength(f64),
}

/// Errors related to the live candle feed and its connectivity
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("Malformed candle for {symbol}: {reason}")]
    MalformedCandle { symbol: String, reason: String },

    #[error("Snapshot request failed for {symbol}: {reason}")]
    SnapshotFailed { symbol: String, reason: String },

    #[error("No active subscription for {symbol} ({interval})")]
    NotSubscribed { symbol: String, interval: String },
}
