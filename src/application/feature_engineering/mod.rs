//! Feature derivation for the ML path.
//!
//! All features are computed over the whole window, shifted by one bar so the
//! row labelled with candle `t` only uses data up to `t - 1`, then gap-filled.

pub mod indicators;

use crate::domain::errors::SignalError;
use crate::domain::market::CandleWindow;
use crate::domain::ml::{FEATURE_NAMES, FeatureRow};
use indicators::*;
use tracing::debug;

/// Candles needed for a fully defined latest row: 90 log returns for
/// `volatility_90d`, one more bar for the first return, one for the shift.
pub const MIN_HISTORY: usize = 92;

/// Aligned feature table: one row per candle of the source window.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    timestamps: Vec<i64>,
    columns: Vec<(&'static str, Vec<f64>)>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn row(&self, index: usize) -> Option<FeatureRow> {
        let timestamp = *self.timestamps.get(index)?;
        Some(FeatureRow::new(
            timestamp,
            self.columns.iter().map(|(name, values)| (*name, values[index])),
        ))
    }

    pub fn latest(&self) -> Option<FeatureRow> {
        self.row(self.len().checked_sub(1)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngine;

impl FeatureEngine {
    pub fn new() -> Self {
        Self
    }

    /// Feature row for the newest candle in the window.
    pub fn derive(&self, window: &CandleWindow) -> Result<FeatureRow, SignalError> {
        let frame = self.derive_frame(window)?;
        frame.latest().ok_or(SignalError::InsufficientHistory {
            required: MIN_HISTORY,
            available: 0,
        })
    }

    pub fn derive_frame(&self, window: &CandleWindow) -> Result<FeatureFrame, SignalError> {
        let candles = window.candles();
        if candles.len() < MIN_HISTORY {
            return Err(SignalError::InsufficientHistory {
                required: MIN_HISTORY,
                available: candles.len(),
            });
        }

        let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let low: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volume: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let (stoch_k, stoch_d) = stoch(&high, &low, &close, 14, 3, 3);
        let directional = adx(&high, &low, &close, 14);
        let returns = log_returns(&close);

        let raw: [(&'static str, Vec<f64>); 17] = [
            ("rsi_14", rsi(&close, 14)),
            ("mom_10d", pct_change(&close, 10)),
            ("mom_30d", pct_change(&close, 30)),
            ("stochk_14_3_3", stoch_k),
            ("stochd_14_3_3", stoch_d),
            ("macd_hist", macd_histogram(&close, 12, 26, 9)),
            ("adx_14", directional.adx),
            ("plus_di_14", directional.plus_di),
            ("minus_di_14", directional.minus_di),
            ("sma_50_ratio", ratio_to(&close, &sma(&close, 50))),
            ("ema_20_ratio", ratio_to(&close, &ema(&close, 20))),
            ("atr_14_norm", divide(&atr(&high, &low, &close, 14), &close)),
            ("bbands_width_20_2", bbands_width(&close, 20, 2.0)),
            ("volatility_30d", rolling_std(&returns, 30)),
            ("volatility_90d", rolling_std(&returns, 90)),
            ("obv_pct_change_10d", pct_change(&obv(&close, &volume), 10)),
            ("donchian_width_rel_60", donchian_width(&high, &low, &close, 60)),
        ];
        debug_assert!(raw.iter().map(|(n, _)| *n).eq(FEATURE_NAMES.iter().copied()));

        let mut columns = Vec::with_capacity(raw.len());
        for (name, values) in raw {
            let mut shifted = shift(&values, 1);
            fill_gaps(name, &mut shifted)?;
            columns.push((name, shifted));
        }

        debug!(
            "FeatureEngine: derived {} rows x {} features",
            candles.len(),
            columns.len()
        );

        Ok(FeatureFrame {
            timestamps: candles.iter().map(|c| c.open_time).collect(),
            columns,
        })
    }
}

/// `close / reference - 1`
fn ratio_to(close: &[f64], reference: &[f64]) -> Vec<f64> {
    close.iter().zip(reference).map(|(c, r)| c / r - 1.0).collect()
}

fn divide(numerator: &[f64], denominator: &[f64]) -> Vec<f64> {
    numerator.iter().zip(denominator).map(|(n, d)| n / d).collect()
}

/// Forward-fill the tail and back-fill the head of a column.
///
/// A column must be a (possibly empty) run of `NaN`, a run of finite values,
/// then another run of `NaN`. Anything else is a computation failure.
fn fill_gaps(name: &str, column: &mut [f64]) -> Result<(), SignalError> {
    let failure = |index: usize, reason: &str| SignalError::FeatureComputation {
        feature: name.to_string(),
        index,
        reason: reason.to_string(),
    };

    if let Some(index) = column.iter().position(|v| v.is_infinite()) {
        return Err(failure(index, "non-finite value"));
    }
    let first = column
        .iter()
        .position(|v| !v.is_nan())
        .ok_or_else(|| failure(0, "no defined values"))?;
    let last = column
        .iter()
        .rposition(|v| !v.is_nan())
        .ok_or_else(|| failure(0, "no defined values"))?;

    if let Some(offset) = column[first..=last].iter().position(|v| v.is_nan()) {
        return Err(failure(first + offset, "gap inside the series"));
    }

    let head = column[first];
    column[..first].fill(head);
    let tail = column[last];
    column[last + 1..].fill(tail);
    Ok(())
}
