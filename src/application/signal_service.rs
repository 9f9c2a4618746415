use crate::application::feature_engineering::FeatureEngine;
use crate::application::market_data::CandleStore;
use crate::application::ml::ModelInferenceEngine;
use crate::application::strategies::TechnicalStrategy;
use crate::domain::errors::SignalError;
use crate::domain::signal::{SignalRequest, SignalResponse, SignalType};
use crate::infrastructure::observability::Metrics;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

/// Lifecycle of a single signal request, logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Snapshotted,
    TechnicalPath,
    MlPath,
    Responded,
    Failed,
}

/// Request/response entry point of the signal core.
///
/// Requests only read snapshots, so any number of them may run concurrently
/// with the feed tasks, and dropping one mid-flight leaves no state behind.
pub struct SignalService {
    store: Arc<CandleStore>,
    strategy: Arc<dyn TechnicalStrategy>,
    features: FeatureEngine,
    model: Arc<ModelInferenceEngine>,
    metrics: Metrics,
}

impl SignalService {
    pub fn new(
        store: Arc<CandleStore>,
        strategy: Arc<dyn TechnicalStrategy>,
        model: Arc<ModelInferenceEngine>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            strategy,
            features: FeatureEngine::new(),
            model,
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<CandleStore> {
        &self.store
    }

    pub fn model(&self) -> &Arc<ModelInferenceEngine> {
        &self.model
    }

    /// Answer one request. Every failure degrades to `success = false`, HOLD.
    pub fn handle(&self, request: &SignalRequest) -> SignalResponse {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "signal_request",
            %request_id,
            symbol = %request.symbol,
            mode = %request.signal_type
        );
        let _guard = span.enter();

        debug!(state = ?RequestState::Received, "SignalService: request received");
        let mode = request.signal_type.to_string();

        match self.compute(request) {
            Ok(response) => {
                debug!(
                    state = ?RequestState::Responded,
                    "SignalService: {} {} -> {}",
                    request.symbol, mode, response.suggestion
                );
                self.metrics.inc_requests(&mode, "success");
                response
            }
            Err(e) => {
                warn!(
                    state = ?RequestState::Failed,
                    "SignalService: {} {} failed: {}",
                    request.symbol, mode, e
                );
                self.metrics.inc_requests(&mode, "failure");
                SignalResponse::failed(Utc::now().timestamp_millis())
            }
        }
    }

    /// Entry point for loosely typed callers: an unknown signal type is a
    /// failed response, not an error.
    pub fn handle_raw(&self, symbol: &str, signal_type: &str) -> SignalResponse {
        match signal_type.parse::<SignalType>() {
            Ok(signal_type) => self.handle(&SignalRequest::new(symbol, signal_type)),
            Err(e) => self.reject(&format!("request for {}: {}", symbol, e)),
        }
    }

    /// Failed response for a request that never reached a computation path.
    pub fn reject(&self, reason: &str) -> SignalResponse {
        warn!("SignalService: rejected {}", reason);
        self.metrics.inc_requests("UNKNOWN", "failure");
        SignalResponse::failed(Utc::now().timestamp_millis())
    }

    fn compute(&self, request: &SignalRequest) -> Result<SignalResponse, SignalError> {
        let snapshot = self.store.snapshot(&request.symbol)?;
        debug!(
            state = ?RequestState::Snapshotted,
            "SignalService: snapshot of {} candles",
            snapshot.len()
        );

        match request.signal_type {
            SignalType::Technical => {
                debug!(state = ?RequestState::TechnicalPath, "SignalService: {}", self.strategy.name());
                let evaluation = self.strategy.evaluate(&snapshot)?;
                Ok(SignalResponse::technical(
                    evaluation.timestamp,
                    evaluation.suggestion,
                ))
            }
            SignalType::Ml => {
                debug!(state = ?RequestState::MlPath, "SignalService: model inference");
                let started = Instant::now();
                let row = self.features.derive(&snapshot)?;
                let (suggestion, prediction) = self.model.predict(&row)?;
                self.metrics
                    .observe_inference_latency(started.elapsed().as_secs_f64());
                Ok(SignalResponse::ml(row.timestamp, suggestion, prediction))
            }
        }
    }
}
