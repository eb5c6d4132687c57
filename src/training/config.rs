//! Training configuration

use crate::features::{FEATURE_COLUMNS, TARGET_COLUMN};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model family trained by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    /// L2-regularized logistic regression
    LogisticRegression,
    /// Random forest classifier
    RandomForest,
}

impl ModelType {
    /// Families trained by default, in run order
    pub fn all() -> Vec<ModelType> {
        vec![ModelType::LogisticRegression, ModelType::RandomForest]
    }

    /// Run name recorded in the tracking store
    pub fn run_name(&self) -> &'static str {
        match self {
            ModelType::LogisticRegression => "LogisticRegression",
            ModelType::RandomForest => "RandomForest",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.run_name())
    }
}

/// Configuration for a training invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Target column name
    pub target_column: String,

    /// Feature columns, in the order the model sees them
    pub feature_columns: Vec<String>,

    /// Holdout fraction
    pub test_size: f64,

    /// Seed for the split and the forest
    pub random_state: u64,

    /// Families to train, one run each
    pub models: Vec<ModelType>,

    // Logistic regression
    /// L2 regularization strength
    pub reg_alpha: f64,

    /// Gradient descent step size
    pub learning_rate: f64,

    /// Maximum gradient descent iterations
    pub max_iter: usize,

    // Random forest
    /// Number of trees
    pub n_estimators: usize,

    /// Maximum depth of trees
    pub max_depth: Option<usize>,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: TARGET_COLUMN.to_string(),
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            test_size: 0.2,
            random_state: 42,
            models: ModelType::all(),
            reg_alpha: 0.01,
            learning_rate: 0.1,
            max_iter: 1000,
            n_estimators: 200,
            max_depth: Some(5),
            min_samples_leaf: 1,
        }
    }
}

impl TrainingConfig {
    /// Builder method to set the model families
    pub fn with_models(mut self, models: Vec<ModelType>) -> Self {
        self.models = models;
        self
    }

    /// Builder method to set the holdout fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set number of estimators
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set max depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Builder method to set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Builder method to set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}
