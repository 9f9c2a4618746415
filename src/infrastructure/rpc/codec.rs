//! JSON codec for the signal request/response boundary.

use crate::application::signal_service::SignalService;
use crate::domain::signal::SignalResponse;
use serde::Deserialize;

/// Request as received on the wire. `signal_type` stays a string so that an
/// unknown mode can be answered with a failure response.
#[derive(Debug, Deserialize)]
pub struct WireRequest {
    pub symbol: String,
    pub signal_type: String,
}

pub fn decode_request(line: &str) -> Result<WireRequest, serde_json::Error> {
    serde_json::from_str(line.trim())
}

pub fn encode_response(response: &SignalResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| {
        format!(
            r#"{{"success":false,"suggestion":"HOLD","timestamp":{}}}"#,
            response.timestamp
        )
    })
}

/// Decode one request line, answer it, encode the response. Never fails.
pub fn handle_line(service: &SignalService, line: &str) -> String {
    let response = match decode_request(line) {
        Ok(request) => service.handle_raw(&request.symbol, &request.signal_type),
        Err(e) => service.reject(&format!("malformed request: {}", e)),
    };
    encode_response(&response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{Prediction, Suggestion};

    #[test]
    fn test_decode_request() {
        let request = decode_request(r#" {"symbol":"BTC","signal_type":"TECHNICAL"} "#).unwrap();
        assert_eq!(request.symbol, "BTC");
        assert_eq!(request.signal_type, "TECHNICAL");
        assert!(decode_request(r#"{"symbol":"BTC"}"#).is_err());
        assert!(decode_request("not json").is_err());
    }

    #[test]
    fn test_encode_response() {
        let line = encode_response(&SignalResponse::ml(
            5,
            Suggestion::Buy,
            Prediction {
                confidence: 0.75,
                timestamp: 6,
            },
        ));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["suggestion"], "BUY");
        assert_eq!(value["prediction"]["confidence"], 0.75);
        assert!(!line.contains('\n'));
    }
}
