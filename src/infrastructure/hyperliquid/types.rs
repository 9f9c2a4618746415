//! Wire formats of the Hyperliquid info and websocket APIs.

use crate::domain::market::{Candle, CandleInterval};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

/// Candle as sent by `candleSnapshot` and the `candle` websocket channel.
///
/// Prices and volume arrive as decimal strings; numeric values are accepted too.
#[derive(Debug, Clone, Deserialize)]
pub struct WireCandle {
    #[serde(rename = "t")]
    pub open_time: i64,
    #[serde(rename = "T")]
    pub close_time: i64,
    #[serde(rename = "s", default)]
    pub coin: Option<String>,
    #[serde(rename = "i", default)]
    pub interval: Option<String>,
    #[serde(rename = "o", deserialize_with = "number_or_string")]
    pub open: f64,
    #[serde(rename = "h", deserialize_with = "number_or_string")]
    pub high: f64,
    #[serde(rename = "l", deserialize_with = "number_or_string")]
    pub low: f64,
    #[serde(rename = "c", deserialize_with = "number_or_string")]
    pub close: f64,
    #[serde(rename = "v", deserialize_with = "number_or_string")]
    pub volume: f64,
    #[serde(rename = "n", default)]
    pub trades: Option<u64>,
}

impl From<WireCandle> for Candle {
    fn from(wire: WireCandle) -> Self {
        Candle {
            open_time: wire.open_time,
            close_time: wire.close_time,
            open: wire.open,
            high: wire.high,
            low: wire.low,
            close: wire.close,
            volume: wire.volume,
        }
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Envelope of every websocket push.
#[derive(Debug, Deserialize)]
pub struct ChannelMessage {
    pub channel: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CandleSnapshotRequest<'a> {
    coin: &'a str,
    interval: &'a str,
    start_time: i64,
    end_time: i64,
}

/// Body of the `candleSnapshot` info request.
pub fn candle_snapshot_body(coin: &str, interval: CandleInterval, start: i64, end: i64) -> Value {
    json!({
        "type": "candleSnapshot",
        "req": CandleSnapshotRequest {
            coin,
            interval: interval.as_str(),
            start_time: start,
            end_time: end,
        },
    })
}

pub fn subscribe_message(coin: &str, interval: CandleInterval) -> Value {
    subscription_message("subscribe", coin, interval)
}

pub fn unsubscribe_message(coin: &str, interval: CandleInterval) -> Value {
    subscription_message("unsubscribe", coin, interval)
}

fn subscription_message(method: &str, coin: &str, interval: CandleInterval) -> Value {
    json!({
        "method": method,
        "subscription": {
            "type": "candle",
            "coin": coin,
            "interval": interval.as_str(),
        },
    })
}

pub fn ping_message() -> Value {
    json!({ "method": "ping" })
}
