pub mod artifact;
pub mod feature_registry;

pub use artifact::{ClassifierParams, DecisionTree, ModelArtifact, ScalerParams, TreeNode};
pub use feature_registry::{FEATURE_NAMES, FeatureRow};
