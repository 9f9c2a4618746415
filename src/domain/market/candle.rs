use serde::{Deserialize, Serialize};

/// One OHLCV bar. Times are epoch milliseconds.
///
/// A candle is immutable once closed; only the newest bar of a window may
/// still be replaced by a later update carrying the same `open_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// True when the time bounds are ordered and every price/volume is finite.
    pub fn is_well_formed(&self) -> bool {
        self.open_time < self.close_time
            && [self.open, self.high, self.low, self.close, self.volume]
                .iter()
                .all(|v| v.is_finite())
    }
}
