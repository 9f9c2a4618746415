//! Request/response value objects exchanged at the RPC boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Suggestion {
    Buy,
    Hold,
    Short,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suggestion::Buy => write!(f, "BUY"),
            Suggestion::Hold => write!(f, "HOLD"),
            Suggestion::Short => write!(f, "SHORT"),
        }
    }
}

/// Which computation path a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    #[serde(rename = "TECHNICAL")]
    Technical,
    #[serde(rename = "ML")]
    Ml,
}

impl FromStr for SignalType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TECHNICAL" => Ok(SignalType::Technical),
            "ML" => Ok(SignalType::Ml),
            _ => anyhow::bail!("Invalid signal_type: {}. Must be 'TECHNICAL' or 'ML'", s),
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Technical => write!(f, "TECHNICAL"),
            SignalType::Ml => write!(f, "ML"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRequest {
    pub symbol: String,
    pub signal_type: SignalType,
}

impl SignalRequest {
    pub fn new(symbol: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            symbol: symbol.into(),
            signal_type,
        }
    }
}

/// Classifier output attached to ML responses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability of the positive class, in [0, 1].
    pub confidence: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResponse {
    pub success: bool,
    pub suggestion: Suggestion,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

impl SignalResponse {
    pub fn technical(timestamp: i64, suggestion: Suggestion) -> Self {
        Self {
            success: true,
            suggestion,
            timestamp,
            prediction: None,
        }
    }

    pub fn ml(timestamp: i64, suggestion: Suggestion, prediction: Prediction) -> Self {
        Self {
            success: true,
            suggestion,
            timestamp,
            prediction: Some(prediction),
        }
    }

    /// Degraded answer for any failed request: HOLD, no prediction.
    pub fn failed(timestamp: i64) -> Self {
        Self {
            success: false,
            suggestion: Suggestion::Hold,
            timestamp,
            prediction: None,
        }
    }
}
