use ndarray::ArrayView1;
use std::fmt::Debug;

/// Interface for frozen binary classifiers
pub trait BinaryClassifier: Send + Sync + Debug {
    /// Probability of the positive class (0.0 to 1.0) for one standardized row.
    /// Values are in the column order of the model's feature list.
    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> f64;

    /// Get model name/type
    fn name(&self) -> &str;
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
