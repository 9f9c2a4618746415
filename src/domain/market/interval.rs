use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle interval as understood by the exchange feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CandleInterval {
    #[default]
    OneMinute,
    ThreeMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    TwoHours,
    FourHours,
    EightHours,
    TwelveHours,
    OneDay,
    ThreeDays,
    OneWeek,
    OneMonth,
}

impl CandleInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandleInterval::OneMinute => "1m",
            CandleInterval::ThreeMinutes => "3m",
            CandleInterval::FiveMinutes => "5m",
            CandleInterval::FifteenMinutes => "15m",
            CandleInterval::ThirtyMinutes => "30m",
            CandleInterval::OneHour => "1h",
            CandleInterval::TwoHours => "2h",
            CandleInterval::FourHours => "4h",
            CandleInterval::EightHours => "8h",
            CandleInterval::TwelveHours => "12h",
            CandleInterval::OneDay => "1d",
            CandleInterval::ThreeDays => "3d",
            CandleInterval::OneWeek => "1w",
            CandleInterval::OneMonth => "1M",
        }
    }

    /// Bar length in milliseconds (a month is counted as 30 days).
    pub fn duration_ms(&self) -> i64 {
        const MINUTE: i64 = 60 * 1000;
        const HOUR: i64 = 60 * MINUTE;
        const DAY: i64 = 24 * HOUR;
        match self {
            CandleInterval::OneMinute => MINUTE,
            CandleInterval::ThreeMinutes => 3 * MINUTE,
            CandleInterval::FiveMinutes => 5 * MINUTE,
            CandleInterval::FifteenMinutes => 15 * MINUTE,
            CandleInterval::ThirtyMinutes => 30 * MINUTE,
            CandleInterval::OneHour => HOUR,
            CandleInterval::TwoHours => 2 * HOUR,
            CandleInterval::FourHours => 4 * HOUR,
            CandleInterval::EightHours => 8 * HOUR,
            CandleInterval::TwelveHours => 12 * HOUR,
            CandleInterval::OneDay => DAY,
            CandleInterval::ThreeDays => 3 * DAY,
            CandleInterval::OneWeek => 7 * DAY,
            CandleInterval::OneMonth => 30 * DAY,
        }
    }

    /// `(start, end)` in ms covering the last `limit` bars ending at `now_ms`.
    pub fn lookback_range(&self, now_ms: i64, limit: usize) -> (i64, i64) {
        let span = self.duration_ms().saturating_mul(limit as i64);
        (now_ms.saturating_sub(span), now_ms)
    }
}

impl FromStr for CandleInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) and "1m" (minute) differ only by case.
        match s.trim() {
            "1m" => Ok(CandleInterval::OneMinute),
            "3m" => Ok(CandleInterval::ThreeMinutes),
            "5m" => Ok(CandleInterval::FiveMinutes),
            "15m" => Ok(CandleInterval::FifteenMinutes),
            "30m" => Ok(CandleInterval::ThirtyMinutes),
            "1h" => Ok(CandleInterval::OneHour),
            "2h" => Ok(CandleInterval::TwoHours),
            "4h" => Ok(CandleInterval::FourHours),
            "8h" => Ok(CandleInterval::EightHours),
            "12h" => Ok(CandleInterval::TwelveHours),
            "1d" => Ok(CandleInterval::OneDay),
            "3d" => Ok(CandleInterval::ThreeDays),
            "1w" => Ok(CandleInterval::OneWeek),
            "1M" => Ok(CandleInterval::OneMonth),
            other => anyhow::bail!(
                "Invalid candle interval: {}. Valid: 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 8h, 12h, 1d, 3d, 1w, 1M",
                other
            ),
        }
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
