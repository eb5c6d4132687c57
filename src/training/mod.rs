//! Model training module
//!
//! Classifiers (logistic regression, decision trees, random forests), holdout
//! metrics, stratified splitting and the [`TrainingPipeline`] that records one
//! tracked run per model family.

mod config;
mod engine;
mod metrics;
mod pipeline;
mod split;
pub mod decision_tree;
pub mod linear_models;
pub mod random_forest;

pub use config::{ModelType, TrainingConfig};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{ModelRunReport, TrainingPipeline, TrainingReport};
pub use linear_models::LogisticRegression;
pub use metrics::{confusion_counts, roc_auc, ModelMetrics};
pub use pipeline::{Classifier, TrainedPipeline};
pub use random_forest::{MaxFeatures, RandomForest};
pub use split::{stratified_split_indices, take_rows, SplitIndices};

/// Location of the serialized pipeline inside a run's artifact directory
pub const MODEL_ARTIFACT_PATH: &str = "model/pipeline.json";
