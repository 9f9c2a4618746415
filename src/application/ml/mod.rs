pub mod classifiers;
pub mod inference;
pub mod loader;
pub mod predictor;
pub mod scaler;

pub use inference::{ModelInferenceEngine, ModelMetadata};
pub use predictor::BinaryClassifier;
