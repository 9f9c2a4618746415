use super::classifiers::build_classifier;
use super::loader::load_artifact;
use super::predictor::BinaryClassifier;
use super::scaler::StandardScaler;
use crate::domain::errors::SignalError;
use crate::domain::ml::{FeatureRow, ModelArtifact};
use crate::domain::signal::{Prediction, Suggestion};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Where the active model came from and when it was loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetadata {
    pub path: Option<PathBuf>,
    pub loaded_at: DateTime<Utc>,
    pub kind: String,
    pub version: Option<String>,
    pub feature_count: usize,
}

#[derive(Debug)]
struct LoadedModel {
    features: Vec<String>,
    scaler: StandardScaler,
    classifier: Box<dyn BinaryClassifier>,
    threshold: f64,
    metadata: ModelMetadata,
}

impl LoadedModel {
    fn build(artifact: ModelArtifact, path: Option<PathBuf>) -> Result<Self, SignalError> {
        artifact.validate()?;
        let classifier = build_classifier(&artifact.classifier);
        let metadata = ModelMetadata {
            path,
            loaded_at: Utc::now(),
            kind: classifier.name().to_string(),
            version: artifact.version.clone(),
            feature_count: artifact.features.len(),
        };
        Ok(Self {
            scaler: StandardScaler::from_params(&artifact.scaler),
            features: artifact.features,
            classifier,
            threshold: artifact.threshold,
            metadata,
        })
    }
}

/// Applies the active model artifact to feature rows.
///
/// The artifact is held behind an `Arc` so a prediction keeps using the model
/// it started with even if [`ModelInferenceEngine::reload`] swaps it meanwhile.
#[derive(Debug)]
pub struct ModelInferenceEngine {
    current: RwLock<Arc<LoadedModel>>,
}

impl ModelInferenceEngine {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SignalError> {
        let path = path.as_ref();
        let model = LoadedModel::build(load_artifact(path)?, Some(path.to_path_buf()))?;
        Ok(Self::with_model(model))
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, SignalError> {
        Ok(Self::with_model(LoadedModel::build(artifact, None)?))
    }

    fn with_model(model: LoadedModel) -> Self {
        Self {
            current: RwLock::new(Arc::new(model)),
        }
    }

    /// Load a new artifact and swap it in. The previous model stays active on failure.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<ModelMetadata, SignalError> {
        let path = path.as_ref();
        let model = Arc::new(LoadedModel::build(
            load_artifact(path)?,
            Some(path.to_path_buf()),
        )?);
        let metadata = model.metadata.clone();

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = model;
        info!(
            "ModelInferenceEngine: switched to {} model {:?}",
            metadata.kind, metadata.version
        );
        Ok(metadata)
    }

    fn current(&self) -> Arc<LoadedModel> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn metadata(&self) -> ModelMetadata {
        self.current().metadata.clone()
    }

    /// Classify one feature row: BUY above the decision threshold, HOLD otherwise.
    pub fn predict(&self, row: &FeatureRow) -> Result<(Suggestion, Prediction), SignalError> {
        let model = self.current();

        let values = model
            .features
            .iter()
            .map(|name| {
                row.get(name).ok_or_else(|| SignalError::FeatureMismatch {
                    feature: name.clone(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let scaled = model.scaler.transform(&Array1::from(values));
        let probability = model.classifier.predict_proba(scaled.view());
        if !probability.is_finite() {
            return Err(SignalError::InvalidArtifact {
                reason: format!(
                    "{} classifier produced a non-finite probability",
                    model.classifier.name()
                ),
            });
        }
        let probability = probability.clamp(0.0, 1.0);

        let suggestion = if probability > model.threshold {
            Suggestion::Buy
        } else {
            Suggestion::Hold
        };
        debug!(
            "ModelInferenceEngine: p={:.4} threshold={:.2} -> {}",
            probability, model.threshold, suggestion
        );

        Ok((
            suggestion,
            Prediction {
                confidence: probability,
                timestamp: Utc::now().timestamp_millis(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::{ClassifierParams, ScalerParams};

    fn artifact(coefficient: f64, threshold: f64) -> ModelArtifact {
        ModelArtifact {
            version: Some("unit".to_string()),
            features: vec!["rsi_14".to_string()],
            scaler: ScalerParams {
                mean: vec![50.0],
                scale: vec![10.0],
            },
            classifier: ClassifierParams::Logistic {
                coefficients: vec![coefficient],
                intercept: 0.0,
            },
            threshold,
        }
    }

    fn row(rsi: f64) -> FeatureRow {
        FeatureRow::new(1, [("rsi_14", rsi), ("adx_14", 20.0)])
    }

    #[test]
    fn test_buy_above_threshold() {
        let engine = ModelInferenceEngine::from_artifact(artifact(2.0, 0.5)).unwrap();
        let (suggestion, prediction) = engine.predict(&row(70.0)).unwrap();
        assert_eq!(suggestion, Suggestion::Buy);
        assert!(prediction.confidence > 0.5 && prediction.confidence <= 1.0);
    }

    #[test]
    fn test_never_shorts() {
        let engine = ModelInferenceEngine::from_artifact(artifact(2.0, 0.5)).unwrap();
        let (suggestion, prediction) = engine.predict(&row(10.0)).unwrap();
        assert_eq!(suggestion, Suggestion::Hold);
        assert!(prediction.confidence < 0.5);
    }

    #[test]
    fn test_probability_equal_to_threshold_holds() {
        let engine = ModelInferenceEngine::from_artifact(artifact(2.0, 0.5)).unwrap();
        let (suggestion, prediction) = engine.predict(&row(50.0)).unwrap();
        assert_eq!(prediction.confidence, 0.5);
        assert_eq!(suggestion, Suggestion::Hold);
    }

    #[test]
    fn test_missing_feature() {
        let engine = ModelInferenceEngine::from_artifact(artifact(1.0, 0.5)).unwrap();
        let err = engine
            .predict(&FeatureRow::new(1, [("adx_14", 20.0)]))
            .unwrap_err();
        assert_eq!(
            err,
            SignalError::FeatureMismatch {
                feature: "rsi_14".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_artifact_rejected_eagerly() {
        let err = ModelInferenceEngine::from_artifact(artifact(1.0, 1.5)).unwrap_err();
        assert!(matches!(err, SignalError::InvalidArtifact { .. }));
    }

    #[test]
    fn test_reload_swaps_and_keeps_old_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, serde_json::to_string(&artifact(-2.0, 0.5)).unwrap()).unwrap();

        let engine = ModelInferenceEngine::from_artifact(artifact(2.0, 0.5)).unwrap();
        assert_eq!(engine.predict(&row(70.0)).unwrap().0, Suggestion::Buy);
        assert_eq!(engine.metadata().path, None);

        let metadata = engine.reload(&path).unwrap();
        assert_eq!(metadata.path.as_deref(), Some(path.as_path()));
        assert_eq!(metadata.kind, "logistic");
        assert_eq!(engine.predict(&row(70.0)).unwrap().0, Suggestion::Hold);

        assert!(engine.reload(dir.path().join("missing.json")).is_err());
        assert_eq!(engine.metadata().path.as_deref(), Some(path.as_path()));
    }
}
