//! Fitted standardize-then-classify pipeline

use super::config::{ModelType, TrainingConfig};
use super::decision_tree::class_position;
use super::linear_models::LogisticRegression;
use super::random_forest::RandomForest;
use crate::error::{CardioError, Result};
use crate::features::PatientRecord;
use crate::preprocessing::{build_preprocessor, columns_to_array2, StandardScaler};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A fitted classifier of one of the supported families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl Classifier {
    /// Unfitted classifier configured from `config`
    pub fn build(model_type: ModelType, config: &TrainingConfig) -> Self {
        match model_type {
            ModelType::LogisticRegression => Classifier::LogisticRegression(
                LogisticRegression::new()
                    .with_alpha(config.reg_alpha)
                    .with_learning_rate(config.learning_rate)
                    .with_max_iter(config.max_iter),
            ),
            ModelType::RandomForest => {
                let mut rf = RandomForest::new_classifier(config.n_estimators)
                    .with_min_samples_leaf(config.min_samples_leaf)
                    .with_random_state(config.random_state);
                if let Some(depth) = config.max_depth {
                    rf = rf.with_max_depth(depth);
                }
                Classifier::RandomForest(rf)
            }
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            Classifier::LogisticRegression(_) => ModelType::LogisticRegression,
            Classifier::RandomForest(_) => ModelType::RandomForest,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::LogisticRegression(m) => {
                m.fit(x, y)?;
            }
            Classifier::RandomForest(m) => {
                m.fit(x, y)?;
            }
        }
        Ok(())
    }

    /// Probability of class 1 for each row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::LogisticRegression(m) => m.predict_proba(x),
            Classifier::RandomForest(m) => {
                let proba = m.predict_proba(x)?;
                match class_position(m.classes(), 1.0) {
                    Some(col) => Ok(proba.index_axis(Axis(1), col).to_owned()),
                    // trained without any positive rows
                    None => Ok(Array1::zeros(x.nrows())),
                }
            }
        }
    }

    /// Hyperparameters as recorded with the run
    pub fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("model".to_string(), self.model_type().run_name().to_string());
        match self {
            Classifier::LogisticRegression(m) => {
                params.insert("alpha".to_string(), m.alpha.to_string());
                params.insert("learning_rate".to_string(), m.learning_rate.to_string());
                params.insert("max_iter".to_string(), m.max_iter.to_string());
            }
            Classifier::RandomForest(m) => {
                params.insert("n_estimators".to_string(), m.n_estimators.to_string());
                params.insert(
                    "max_depth".to_string(),
                    m.max_depth.map_or_else(|| "None".to_string(), |d| d.to_string()),
                );
                params.insert("min_samples_leaf".to_string(), m.min_samples_leaf.to_string());
                params.insert("max_features".to_string(), format!("{:?}", m.max_features).to_lowercase());
                params.insert("bootstrap".to_string(), m.bootstrap.to_string());
            }
        }
        params
    }
}

/// Scaler and classifier fitted together, plus the feature order they expect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedPipeline {
    feature_names: Vec<String>,
    preprocessor: StandardScaler,
    classifier: Classifier,
}

impl TrainedPipeline {
    /// Fit a pipeline of `model_type` on the training frame
    pub fn fit(model_type: ModelType, config: &TrainingConfig, train: &DataFrame) -> Result<Self> {
        let mut preprocessor = build_preprocessor(&config.feature_columns);
        let scaled = preprocessor.fit_transform(train)?;
        let x = columns_to_array2(&scaled, &config.feature_columns)?;
        let y = target_array(train, &config.target_column)?;

        let mut classifier = Classifier::build(model_type, config);
        classifier.fit(&x, &y)?;

        Ok(Self {
            feature_names: config.feature_columns.clone(),
            preprocessor,
            classifier,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn model_type(&self) -> ModelType {
        self.classifier.model_type()
    }

    /// Positive-class probabilities for raw rows laid out in feature order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scaled = self.preprocessor.transform_array(x)?;
        self.classifier.predict_proba(&scaled)
    }

    /// Positive-class probabilities for a frame holding the feature columns
    pub fn predict_proba_frame(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let scaled = self.preprocessor.transform(df)?;
        let x = columns_to_array2(&scaled, &self.feature_names)?;
        self.classifier.predict_proba(&x)
    }

    /// Hard labels at the 0.5 threshold
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Positive-class probability for a single patient
    pub fn predict_record(&self, record: &PatientRecord) -> Result<f64> {
        let row = self
            .feature_names
            .iter()
            .map(|name| {
                record
                    .get(name)
                    .ok_or_else(|| CardioError::FeatureNotFound(name.clone()))
            })
            .collect::<Result<Vec<f64>>>()?;

        let x = Array2::from_shape_vec((1, row.len()), row)?;
        self.predict_proba(&x)?
            .first()
            .copied()
            .ok_or_else(|| CardioError::InferenceError("empty prediction".to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Write the pipeline as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Read a pipeline written by [`TrainedPipeline::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}

/// Target column as f64 labels
pub(crate) fn target_array(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    let x = columns_to_array2(df, &[target])?;
    Ok(x.column(0).to_owned())
}
