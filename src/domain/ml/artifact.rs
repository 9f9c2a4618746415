//! Schema of the frozen model bundle consumed by the inference engine.
//!
//! A bundle is a single JSON or TOML document:
//!
//! ```json
//! {
//!   "version": "combo-2024-06",
//!   "features": ["rsi_14", "mom_10d"],
//!   "scaler": { "mean": [50.0, 0.0], "scale": [10.0, 0.05] },
//!   "classifier": { "kind": "logistic", "coefficients": [0.4, 1.2], "intercept": -0.1 },
//!   "threshold": 0.55
//! }
//! ```
//!
//! Shape errors are caught by [`ModelArtifact::validate`] at load time, never
//! on the first prediction.

use crate::domain::errors::SignalError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default)]
    pub version: Option<String>,
    /// Feature names in the column order the scaler and classifier expect.
    pub features: Vec<String>,
    pub scaler: ScalerParams,
    pub classifier: ClassifierParams,
    /// Probability above which the positive class becomes a BUY.
    pub threshold: f64,
}

/// Standardization parameters: `(x - mean) / scale` per feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierParams {
    Logistic {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// Additive binary trees with a sigmoid link (raw score = base + sum of leaves).
    GradientBoosting {
        #[serde(default)]
        base_score: f64,
        trees: Vec<DecisionTree>,
    },
}

impl ClassifierParams {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierParams::Logistic { .. } => "logistic",
            ClassifierParams::GradientBoosting { .. } => "gradient_boosting",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Node 0 is the root; children always have a larger index than their parent.
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// `x[feature] <= threshold` goes left; a missing value follows `default_left`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "default_left")]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

fn default_left() -> bool {
    true
}

fn invalid(reason: impl Into<String>) -> SignalError {
    SignalError::InvalidArtifact {
        reason: reason.into(),
    }
}

impl ModelArtifact {
    pub fn validate(&self) -> Result<(), SignalError> {
        let n = self.features.len();
        if n == 0 {
            return Err(invalid("feature list is empty"));
        }

        let mut seen = HashSet::with_capacity(n);
        for name in &self.features {
            if !seen.insert(name.as_str()) {
                return Err(invalid(format!("duplicate feature '{}'", name)));
            }
        }

        if self.scaler.mean.len() != n || self.scaler.scale.len() != n {
            return Err(invalid(format!(
                "scaler has {} means / {} scales for {} features",
                self.scaler.mean.len(),
                self.scaler.scale.len(),
                n
            )));
        }
        if self.scaler.mean.iter().any(|m| !m.is_finite()) {
            return Err(invalid("scaler mean contains a non-finite value"));
        }
        if let Some(i) = self
            .scaler
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(invalid(format!(
                "scaler scale for '{}' must be finite and non-zero",
                self.features[i]
            )));
        }

        if !(self.threshold.is_finite() && (0.0..=1.0).contains(&self.threshold)) {
            return Err(invalid(format!(
                "decision threshold {} outside [0, 1]",
                self.threshold
            )));
        }

        match &self.classifier {
            ClassifierParams::Logistic {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != n {
                    return Err(invalid(format!(
                        "logistic model has {} coefficients for {} features",
                        coefficients.len(),
                        n
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(invalid("logistic parameters must be finite"));
                }
            }
            ClassifierParams::GradientBoosting { base_score, trees } => {
                if !base_score.is_finite() {
                    return Err(invalid("base_score must be finite"));
                }
                if trees.is_empty() {
                    return Err(invalid("gradient boosting model has no trees"));
                }
                for (t, tree) in trees.iter().enumerate() {
                    tree.validate(n).map_err(|reason| invalid(format!("tree {}: {}", t, reason)))?;
                }
            }
        }
        Ok(())
    }
}

impl DecisionTree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("no nodes".to_string());
        }
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on unknown feature {}", i, feature));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has a NaN threshold", i));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= len {
                            return Err(format!("node {} has invalid child {}", i, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} is not finite", i));
                    }
                }
            }
        }
        Ok(())
    }
}
