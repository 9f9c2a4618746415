use super::{Direction, TechnicalEvaluation, TechnicalStrategy, WindowSignal};
use crate::application::risk_management::volatility::{annualized_std, log_returns};
use crate::domain::errors::SignalError;
use crate::domain::market::{CandleWindow, StrategyConfig};
use crate::domain::signal::Suggestion;
use std::sync::Arc;
use ta::Next;
use ta::indicators::{Maximum, Minimum};
use tracing::debug;

/// Floor applied to a window's volatility before inverting it into a vote weight.
const MIN_VOTE_VOLATILITY: f64 = 1e-8;

/// Donchian Channel Breakout with volatility targeting
///
/// For every configured look-back `w`:
/// - Channel = highest high / lowest low of the `w` bars before the last one
/// - Close above the channel high votes long, below the channel low votes short
/// - Each vote is weighted by the inverse of the window's realized volatility
///
/// The winning direction is sized by `target_volatility / realized_volatility`,
/// capped at `max_allocation`.
#[derive(Debug, Clone)]
pub struct DonchianStrategy {
    config: Arc<StrategyConfig>,
}

impl DonchianStrategy {
    pub fn new(config: Arc<StrategyConfig>) -> Self {
        Self { config }
    }

    /// Minimum number of candles needed before any window can be evaluated.
    pub fn required_candles(&self) -> usize {
        self.config.largest_window().max(2)
    }

    fn window_signal(
        &self,
        window: usize,
        highs: &[f64],
        lows: &[f64],
        returns: &[f64],
        last_close: f64,
    ) -> Result<WindowSignal, SignalError> {
        // Channel of the previous bar: the last bar is the one being tested
        let prior = highs.len() - 1;
        let period = window.min(prior);

        let mut maximum = Maximum::new(period).map_err(|_| SignalError::InsufficientData {
            required: window,
            available: highs.len(),
        })?;
        let mut minimum = Minimum::new(period).map_err(|_| SignalError::InsufficientData {
            required: window,
            available: lows.len(),
        })?;

        let start = prior - period;
        let mut channel_high = f64::NAN;
        let mut channel_low = f64::NAN;
        for (&high, &low) in highs[start..prior].iter().zip(&lows[start..prior]) {
            channel_high = maximum.next(high);
            channel_low = minimum.next(low);
        }

        let direction = if last_close > channel_high {
            Direction::Long
        } else if last_close < channel_low {
            Direction::Short
        } else {
            Direction::Neutral
        };

        let recent = &returns[returns.len().saturating_sub(window)..];
        let periods = self.config.periods_per_year as f64;
        let volatility = annualized_std(recent, periods);

        let sharpe = match volatility {
            Some(vol) if vol > 0.0 => {
                let mean = recent.iter().sum::<f64>() / recent.len() as f64;
                (mean * periods - self.config.risk_free_rate) / vol
            }
            _ => 0.0,
        };

        Ok(WindowSignal {
            window,
            direction,
            channel_high,
            channel_low,
            volatility,
            weight: 1.0 / volatility.unwrap_or(0.0).max(MIN_VOTE_VOLATILITY),
            sharpe,
        })
    }

    /// Position size for the current realized volatility, before the sign is applied.
    fn target_size(&self, volatility: Option<f64>) -> f64 {
        match volatility {
            Some(vol) if vol > 0.0 => {
                (self.config.target_volatility / vol).min(self.config.max_allocation)
            }
            _ => self.config.max_allocation,
        }
    }
}

/// Inverse-volatility weighted vote. Any tie for the top score resolves to neutral.
pub fn aggregate_votes(signals: &[WindowSignal]) -> Direction {
    let mut long = 0.0;
    let mut short = 0.0;
    let mut neutral = 0.0;
    for signal in signals {
        match signal.direction {
            Direction::Long => long += signal.weight,
            Direction::Short => short += signal.weight,
            Direction::Neutral => neutral += signal.weight,
        }
    }

    if long > short && long > neutral {
        Direction::Long
    } else if short > long && short > neutral {
        Direction::Short
    } else {
        Direction::Neutral
    }
}

impl TechnicalStrategy for DonchianStrategy {
    fn evaluate(&self, window: &CandleWindow) -> Result<TechnicalEvaluation, SignalError> {
        let candles = window.candles();
        let required = self.required_candles();
        if candles.len() < required {
            return Err(SignalError::InsufficientData {
                required,
                available: candles.len(),
            });
        }

        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let returns = log_returns(&closes);
        let last = candles[candles.len() - 1];

        let windows = self
            .config
            .look_back_windows
            .iter()
            .map(|&w| self.window_signal(w, &highs, &lows, &returns, last.close))
            .collect::<Result<Vec<_>, _>>()?;

        let direction = aggregate_votes(&windows);

        let total_weight: f64 = windows.iter().map(|s| s.weight).sum();
        let risk_adjusted_score = if total_weight > 0.0 {
            windows.iter().map(|s| s.weight * s.sharpe).sum::<f64>() / total_weight
        } else {
            0.0
        };

        let recent = &returns[returns.len().saturating_sub(self.config.volatility_window)..];
        let realized_volatility = annualized_std(recent, self.config.periods_per_year as f64);

        let signed = direction.sign() * self.target_size(realized_volatility);
        let (suggestion, size) = if signed.abs() < self.config.min_signal_strength {
            (Suggestion::Hold, 0.0)
        } else if signed > 0.0 {
            (Suggestion::Buy, signed)
        } else {
            (Suggestion::Short, signed)
        };

        debug!(
            "DonchianStrategy: {:?} -> {} size={:.4} vol={:?} score={:.4}",
            direction, suggestion, size, realized_volatility, risk_adjusted_score
        );

        Ok(TechnicalEvaluation {
            timestamp: last.open_time,
            suggestion,
            size,
            realized_volatility,
            risk_adjusted_score,
            windows,
        })
    }

    fn name(&self) -> &str {
        "Donchian"
    }
}
