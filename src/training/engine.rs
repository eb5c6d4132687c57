//! Training pipeline runner
//!
//! Splits a prepared dataset, fits one pipeline per model family and records
//! each as a run in the tracking store.

use super::config::{ModelType, TrainingConfig};
use super::metrics::ModelMetrics;
use super::pipeline::{target_array, Classifier, TrainedPipeline};
use super::split::{stratified_split_indices, take_rows};
use super::MODEL_ARTIFACT_PATH;
use crate::data::{load_dataset, validate_columns};
use crate::error::{CardioError, Result};
use crate::tracking::{ExperimentTracker, Run, RunStatus, DEFAULT_EXPERIMENT_NAME};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// Outcome of one model family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRunReport {
    pub model_type: ModelType,
    pub run_id: String,
    pub status: RunStatus,
    pub metrics: Option<ModelMetrics>,
    pub error: Option<String>,
    pub training_time_secs: f64,
}

/// Summary of a training invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub experiment_id: String,
    pub experiment_name: String,
    pub n_train: usize,
    pub n_test: usize,
    pub runs: Vec<ModelRunReport>,
}

impl TrainingReport {
    /// Finished run with the highest ROC-AUC
    pub fn best(&self) -> Option<&ModelRunReport> {
        self.runs
            .iter()
            .filter(|r| r.status == RunStatus::Finished)
            .filter_map(|r| r.metrics.as_ref().map(|m| (r, m.roc_auc)))
            .filter(|(_, auc)| auc.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(r, _)| r)
    }

    pub fn n_failed(&self) -> usize {
        self.runs.iter().filter(|r| r.status == RunStatus::Failed).count()
    }
}

/// Trains every configured model family and logs one run per family
pub struct TrainingPipeline {
    config: TrainingConfig,
    tracker: ExperimentTracker,
    experiment_name: String,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig, tracker: ExperimentTracker) -> Self {
        Self {
            config,
            tracker,
            experiment_name: DEFAULT_EXPERIMENT_NAME.to_string(),
        }
    }

    /// Record runs under `name` instead of the default experiment
    pub fn with_experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Load the CSV at `dataset_path` and train on it
    pub fn run(&self, dataset_path: impl AsRef<Path>) -> Result<TrainingReport> {
        let path = dataset_path.as_ref();
        info!(path = %path.display(), "Loading training dataset");
        let df = load_dataset(path)?;
        self.run_frame(&df)
    }

    /// Train on an in-memory frame
    pub fn run_frame(&self, df: &DataFrame) -> Result<TrainingReport> {
        if self.config.models.is_empty() {
            return Err(CardioError::ConfigError("no model families configured".to_string()));
        }

        validate_columns(df, &self.config.feature_columns, &self.config.target_column)?;

        let labels = target_array(df, &self.config.target_column)?.to_vec();
        let split = stratified_split_indices(&labels, self.config.test_size, self.config.random_state)?;
        if split.train.is_empty() || split.test.is_empty() {
            return Err(CardioError::DataError(format!(
                "dataset of {} rows is too small to split",
                df.height()
            )));
        }

        let train_df = take_rows(df, &split.train)?;
        let test_df = take_rows(df, &split.test)?;

        let experiment = self.tracker.get_or_create_experiment(&self.experiment_name)?;
        info!(
            experiment_id = %experiment.experiment_id,
            experiment = %experiment.name,
            n_train = train_df.height(),
            n_test = test_df.height(),
            models = self.config.models.len(),
            "Starting training"
        );

        let mut runs = Vec::with_capacity(self.config.models.len());
        for &model_type in &self.config.models {
            runs.push(self.run_model(&experiment.experiment_id, model_type, &train_df, &test_df)?);
        }

        let report = TrainingReport {
            experiment_id: experiment.experiment_id,
            experiment_name: experiment.name,
            n_train: train_df.height(),
            n_test: test_df.height(),
            runs,
        };

        if report.n_failed() == report.runs.len() {
            let reasons: Vec<String> = report
                .runs
                .iter()
                .map(|r| format!("{}: {}", r.model_type, r.error.as_deref().unwrap_or("unknown error")))
                .collect();
            return Err(CardioError::TrainingError(format!(
                "every model family failed ({})",
                reasons.join("; ")
            )));
        }

        Ok(report)
    }

    /// Train one family inside its own run; failures end the run as `Failed`
    fn run_model(
        &self,
        experiment_id: &str,
        model_type: ModelType,
        train_df: &DataFrame,
        test_df: &DataFrame,
    ) -> Result<ModelRunReport> {
        let mut run = self.tracker.start_run(experiment_id, model_type.run_name())?;
        let start = Instant::now();

        let outcome = self.fit_and_log(model_type, &mut run, train_df, test_df);
        let training_time_secs = start.elapsed().as_secs_f64();

        match outcome {
            Ok(metrics) => {
                self.tracker.end_run(&mut run, RunStatus::Finished)?;
                info!(
                    model = %model_type,
                    run_id = %run.run_id,
                    accuracy = metrics.accuracy,
                    precision = metrics.precision,
                    recall = metrics.recall,
                    roc_auc = metrics.roc_auc,
                    elapsed_secs = training_time_secs,
                    "Model trained"
                );
                Ok(ModelRunReport {
                    model_type,
                    run_id: run.run_id,
                    status: RunStatus::Finished,
                    metrics: Some(metrics),
                    error: None,
                    training_time_secs,
                })
            }
            Err(e) => {
                error!(model = %model_type, run_id = %run.run_id, error = %e, "Model training failed");
                self.tracker.end_run(&mut run, RunStatus::Failed)?;
                Ok(ModelRunReport {
                    model_type,
                    run_id: run.run_id,
                    status: RunStatus::Failed,
                    metrics: None,
                    error: Some(e.to_string()),
                    training_time_secs,
                })
            }
        }
    }

    fn fit_and_log(
        &self,
        model_type: ModelType,
        run: &mut Run,
        train_df: &DataFrame,
        test_df: &DataFrame,
    ) -> Result<ModelMetrics> {
        let mut params: BTreeMap<String, String> =
            Classifier::build(model_type, &self.config).params();
        params.insert("test_size".to_string(), self.config.test_size.to_string());
        params.insert("random_state".to_string(), self.config.random_state.to_string());
        params.insert("n_train".to_string(), train_df.height().to_string());
        params.insert("n_test".to_string(), test_df.height().to_string());
        params.insert("n_features".to_string(), self.config.feature_columns.len().to_string());
        self.tracker.log_params(run, params)?;

        let pipeline = TrainedPipeline::fit(model_type, &self.config, train_df)?;

        let y_test = target_array(test_df, &self.config.target_column)?;
        let y_prob = pipeline.predict_proba_frame(test_df)?;
        let y_pred = y_prob.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });
        let metrics = ModelMetrics::compute(&y_test, &y_pred, &y_prob);

        self.tracker.log_metrics(run, metrics.to_map())?;
        self.tracker
            .log_artifact(run, MODEL_ARTIFACT_PATH, &pipeline.to_bytes()?)?;

        Ok(metrics)
    }
}
