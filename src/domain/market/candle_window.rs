//! Bounded, time-ordered candle buffer for a single symbol.
//!
//! The window never holds more than `capacity` candles and keeps them sorted
//! by strictly increasing `open_time`. Concurrency is the store's concern;
//! this type is plain owned data.

use super::candle::Candle;

/// Result of merging one feed update into a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergeOutcome {
    /// The update carried the same `open_time` as the newest bar (still open).
    Replaced,
    /// A new bar was appended; `evicted` is the oldest bar dropped to stay in capacity.
    Appended { evicted: Option<Candle> },
}

/// An update older than the newest stored bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaleCandle {
    pub incoming: i64,
    pub last: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandleWindow {
    capacity: usize,
    candles: Vec<Candle>,
}

impl CandleWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            candles: Vec::with_capacity(capacity.max(1)),
        }
    }

    /// Build a window from a historical snapshot.
    ///
    /// Exchanges occasionally return the live bar twice or slightly out of
    /// order, so the history is sorted, duplicates collapse to the last copy,
    /// and only the newest `capacity` bars are kept.
    pub fn seeded(capacity: usize, mut history: Vec<Candle>) -> Self {
        history.sort_by_key(|c| c.open_time);

        let mut window = Self::with_capacity(capacity);
        for candle in history {
            match window.candles.last_mut() {
                Some(last) if last.open_time == candle.open_time => *last = candle,
                _ => window.candles.push(candle),
            }
        }
        window.evict_overflow();
        window
    }

    /// Merge one update: same `open_time` as the newest bar replaces it, a newer
    /// one appends (evicting FIFO past capacity), an older one is rejected.
    pub fn merge(&mut self, candle: Candle) -> Result<MergeOutcome, StaleCandle> {
        match self.candles.last_mut() {
            Some(last) if candle.open_time == last.open_time => {
                *last = candle;
                Ok(MergeOutcome::Replaced)
            }
            Some(last) if candle.open_time < last.open_time => Err(StaleCandle {
                incoming: candle.open_time,
                last: last.open_time,
            }),
            _ => {
                self.candles.push(candle);
                let evicted = self.evict_overflow();
                Ok(MergeOutcome::Appended { evicted })
            }
        }
    }

    fn evict_overflow(&mut self) -> Option<Candle> {
        if self.candles.len() <= self.capacity {
            return None;
        }
        let excess = self.candles.len() - self.capacity;
        self.candles.drain(..excess).last()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
