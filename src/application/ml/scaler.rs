use crate::domain::ml::ScalerParams;
use ndarray::Array1;

/// Frozen standardization: `(x - mean) / scale` per column.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn from_params(params: &ScalerParams) -> Self {
        Self {
            mean: Array1::from(params.mean.clone()),
            scale: Array1::from(params.scale.clone()),
        }
    }

    pub fn transform(&self, values: &Array1<f64>) -> Array1<f64> {
        (values - &self.mean) / &self.scale
    }
}
