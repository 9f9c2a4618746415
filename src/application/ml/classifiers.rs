use super::predictor::{BinaryClassifier, sigmoid};
use crate::domain::ml::{ClassifierParams, DecisionTree, TreeNode};
use ndarray::{Array1, ArrayView1};

#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LogisticClassifier {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients: Array1::from(coefficients),
            intercept,
        }
    }
}

impl BinaryClassifier for LogisticClassifier {
    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> f64 {
        sigmoid(self.coefficients.dot(&features) + self.intercept)
    }

    fn name(&self) -> &str {
        "logistic"
    }
}

/// Gradient-boosted binary trees: `sigmoid(base_score + sum of leaf values)`.
#[derive(Debug, Clone)]
pub struct BoostedTreesClassifier {
    base_score: f64,
    trees: Vec<DecisionTree>,
}

impl BoostedTreesClassifier {
    pub fn new(base_score: f64, trees: Vec<DecisionTree>) -> Self {
        Self { base_score, trees }
    }

    /// Leaf value reached by one row. Trees are validated at load time, so
    /// every child index points forward and the walk terminates.
    fn leaf_value(tree: &DecisionTree, features: &ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        loop {
            match tree.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                }) => {
                    let x = features[*feature];
                    let go_left = if x.is_nan() {
                        *default_left
                    } else {
                        x <= *threshold
                    };
                    index = if go_left { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }
}

impl BinaryClassifier for BoostedTreesClassifier {
    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> f64 {
        let raw = self.base_score
            + self
                .trees
                .iter()
                .map(|tree| Self::leaf_value(tree, &features))
                .sum::<f64>();
        sigmoid(raw)
    }

    fn name(&self) -> &str {
        "gradient_boosting"
    }
}

/// Build the classifier described by validated artifact parameters.
pub fn build_classifier(params: &ClassifierParams) -> Box<dyn BinaryClassifier> {
    match params {
        ClassifierParams::Logistic {
            coefficients,
            intercept,
        } => Box::new(LogisticClassifier::new(coefficients.clone(), *intercept)),
        ClassifierParams::GradientBoosting { base_score, trees } => {
            Box::new(BoostedTreesClassifier::new(*base_score, trees.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn stump(threshold: f64, default_left: bool) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold,
                    left: 1,
                    right: 2,
                    default_left,
                },
                TreeNode::Leaf { value: -2.0 },
                TreeNode::Leaf { value: 2.0 },
            ],
        }
    }

    #[test]
    fn test_logistic_probability() {
        let model = LogisticClassifier::new(vec![1.0, -1.0], 0.5);
        let p = model.predict_proba(array![1.0, 1.5].view());
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tree_split_goes_left_on_equal() {
        let model = BoostedTreesClassifier::new(0.0, vec![stump(1.0, true)]);
        assert!((model.predict_proba(array![1.0].view()) - sigmoid(-2.0)).abs() < 1e-12);
        assert!((model.predict_proba(array![1.1].view()) - sigmoid(2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_missing_value_follows_default_direction() {
        let left = BoostedTreesClassifier::new(0.0, vec![stump(0.0, true)]);
        let right = BoostedTreesClassifier::new(0.0, vec![stump(0.0, false)]);
        assert!(left.predict_proba(array![f64::NAN].view()) < 0.5);
        assert!(right.predict_proba(array![f64::NAN].view()) > 0.5);
    }

    #[test]
    fn test_trees_are_additive() {
        let model = BoostedTreesClassifier::new(0.5, vec![stump(0.0, true), stump(10.0, true)]);
        // 5.0 goes right in the first tree (+2) and left in the second (-2)
        let p = model.predict_proba(array![5.0].view());
        assert!((p - sigmoid(0.5)).abs() < 1e-12);
    }
}
