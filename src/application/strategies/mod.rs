mod donchian;

pub use donchian::{DonchianStrategy, aggregate_votes};

use crate::domain::errors::SignalError;
use crate::domain::market::CandleWindow;
use crate::domain::signal::Suggestion;

/// Breakout direction of a single look-back window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
            Direction::Neutral => 0.0,
        }
    }
}

/// Per-window breakdown reported alongside the aggregated decision.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSignal {
    pub window: usize,
    pub direction: Direction,
    pub channel_high: f64,
    pub channel_low: f64,
    /// Annualized volatility of the window's own returns.
    pub volatility: Option<f64>,
    pub weight: f64,
    /// Annualized mean return over the risk-free rate, per unit of volatility.
    pub sharpe: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TechnicalEvaluation {
    /// `open_time` of the last candle in the evaluated window.
    pub timestamp: i64,
    pub suggestion: Suggestion,
    /// Signed target allocation: positive for BUY, negative for SHORT, zero for HOLD.
    pub size: f64,
    pub realized_volatility: Option<f64>,
    pub risk_adjusted_score: f64,
    pub windows: Vec<WindowSignal>,
}

pub trait TechnicalStrategy: Send + Sync {
    fn evaluate(&self, window: &CandleWindow) -> Result<TechnicalEvaluation, SignalError>;

    /// Get strategy name
    fn name(&self) -> &str;
}
