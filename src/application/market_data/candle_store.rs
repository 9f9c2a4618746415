//! Per-symbol candle windows shared between the feed tasks and request handlers.
//!
//! Each symbol's window is published as an `Arc<CandleWindow>` behind a short
//! write lock. A snapshot is a clone of that `Arc`, so readers hold an
//! immutable version that later merges can never touch: `Arc::make_mut`
//! copies the window whenever a snapshot is still alive and mutates in place
//! otherwise.

use crate::domain::errors::SignalError;
use crate::domain::market::{Candle, CandleWindow, MergeOutcome};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Immutable view of a symbol's window at one point in time.
pub type CandleSnapshot = Arc<CandleWindow>;

type SymbolSlot = Arc<RwLock<CandleSnapshot>>;

// Writers only ever leave a complete window behind, so a poisoned lock still
// guards consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub struct CandleStore {
    capacity: usize,
    windows: RwLock<HashMap<String, SymbolSlot>>,
}

impl CandleStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Seed (or re-seed) a symbol from a historical snapshot.
    ///
    /// Returns the number of candles kept after de-duplication and trimming.
    pub fn initialize(&self, symbol: &str, history: Vec<Candle>) -> Result<usize, SignalError> {
        if history.is_empty() {
            return Err(SignalError::DataUnavailable {
                symbol: symbol.to_string(),
            });
        }

        let window = Arc::new(CandleWindow::seeded(self.capacity, history));
        let len = window.len();

        let existing = read(&self.windows).get(symbol).cloned();
        match existing {
            Some(slot) => *write(&slot) = window,
            None => {
                write(&self.windows)
                    .entry(symbol.to_string())
                    .and_modify(|slot| *write(slot) = window.clone())
                    .or_insert_with(|| Arc::new(RwLock::new(window.clone())));
            }
        }

        info!("CandleStore: {} seeded with {} candles", symbol, len);
        Ok(len)
    }

    /// Apply one feed update to a symbol's window.
    pub fn merge(&self, symbol: &str, candle: Candle) -> Result<MergeOutcome, SignalError> {
        let slot = self.slot(symbol)?;
        let mut current = write(&slot);

        let outcome = Arc::make_mut(&mut current)
            .merge(candle)
            .map_err(|stale| SignalError::OutOfOrderCandle {
                symbol: symbol.to_string(),
                incoming: stale.incoming,
                last: stale.last,
            })?;

        if let MergeOutcome::Appended { evicted } = outcome {
            debug!(
                "CandleStore: {} new candle at {} (evicted: {})",
                symbol,
                candle.open_time,
                evicted.is_some()
            );
        }
        Ok(outcome)
    }

    /// Consistent, immutable copy of a symbol's window.
    pub fn snapshot(&self, symbol: &str) -> Result<CandleSnapshot, SignalError> {
        let slot = self.slot(symbol)?;
        let current = read(&slot).clone();
        Ok(current)
    }

    pub fn len(&self, symbol: &str) -> Option<usize> {
        self.snapshot(symbol).ok().map(|w| w.len())
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = read(&self.windows).keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Drop a symbol's window; later snapshots fail with `UnknownSymbol`.
    pub fn remove(&self, symbol: &str) -> bool {
        write(&self.windows).remove(symbol).is_some()
    }

    fn slot(&self, symbol: &str) -> Result<SymbolSlot, SignalError> {
        read(&self.windows)
            .get(symbol)
            .cloned()
            .ok_or_else(|| SignalError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }
}
