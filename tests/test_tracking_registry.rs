//! Integration test: tracking store and best-run selection

use std::collections::BTreeMap;

use cardio_mlops::features::{FEATURE_COLUMNS, TARGET_COLUMN};
use cardio_mlops::registry::load_best_pipeline;
use cardio_mlops::tracking::{ExperimentTracker, RunStatus, TrackingConfig};
use cardio_mlops::training::{ModelType, TrainedPipeline, TrainingConfig, MODEL_ARTIFACT_PATH};
use cardio_mlops::CardioError;
use polars::prelude::*;

fn heart_df(n: usize) -> DataFrame {
    let mut columns: Vec<Column> = FEATURE_COLUMNS
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = (0..n)
                .map(|i| ((i % 2) as f64) * (j as f64 + 1.0) + ((i * 3 + j) % 5) as f64)
                .collect();
            Column::new((*name).into(), values)
        })
        .collect();
    columns.push(Column::new(TARGET_COLUMN.into(), (0..n).map(|i| (i % 2) as i64).collect::<Vec<_>>()));
    DataFrame::new(columns).unwrap()
}

/// Record a finished run with the given AUC whose artifact is `pipeline`
fn log_run(tracker: &ExperimentTracker, experiment_id: &str, auc: f64, pipeline: &TrainedPipeline) -> String {
    let mut run = tracker.start_run(experiment_id, pipeline.model_type().run_name()).unwrap();
    let mut metrics = BTreeMap::new();
    metrics.insert("roc_auc".to_string(), auc);
    tracker.log_metrics(&mut run, metrics).unwrap();
    tracker
        .log_artifact(&mut run, MODEL_ARTIFACT_PATH, &pipeline.to_bytes().unwrap())
        .unwrap();
    tracker.end_run(&mut run, RunStatus::Finished).unwrap();
    run.run_id
}

#[test]
fn test_highest_auc_run_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
    let experiment = tracker.get_or_create_experiment("Heart Disease Prediction").unwrap();

    let df = heart_df(40);
    let config = TrainingConfig::default().with_n_estimators(10);
    let lr = TrainedPipeline::fit(ModelType::LogisticRegression, &config, &df).unwrap();
    let rf = TrainedPipeline::fit(ModelType::RandomForest, &config, &df).unwrap();

    log_run(&tracker, &experiment.experiment_id, 0.71, &lr);
    let best_id = log_run(&tracker, &experiment.experiment_id, 0.82, &rf);
    log_run(&tracker, &experiment.experiment_id, 0.65, &lr);

    let loaded = load_best_pipeline(&tracker, "Heart Disease Prediction").unwrap();
    assert_eq!(loaded.run.run_id, best_id);
    assert_eq!(loaded.run.metric("roc_auc"), Some(0.82));
    assert_eq!(loaded.pipeline.model_type(), ModelType::RandomForest);
}

#[test]
fn test_failed_runs_are_never_selected() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
    let experiment = tracker.get_or_create_experiment("exp").unwrap();

    let df = heart_df(30);
    let pipeline = TrainedPipeline::fit(ModelType::LogisticRegression, &TrainingConfig::default(), &df).unwrap();
    let finished = log_run(&tracker, &experiment.experiment_id, 0.6, &pipeline);

    let mut failed = tracker.start_run(&experiment.experiment_id, "random_forest").unwrap();
    let mut metrics = BTreeMap::new();
    metrics.insert("roc_auc".to_string(), 0.99);
    tracker.log_metrics(&mut failed, metrics).unwrap();
    tracker.end_run(&mut failed, RunStatus::Failed).unwrap();

    let loaded = load_best_pipeline(&tracker, "exp").unwrap();
    assert_eq!(loaded.run.run_id, finished);
}

#[test]
fn test_unknown_experiment_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
    assert!(matches!(load_best_pipeline(&tracker, "nope"), Err(CardioError::NotFound(_))));
}

#[test]
fn test_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = TrackingConfig::new(format!("file://{}", dir.path().display()), "exp");

    let experiment_id = {
        let tracker = ExperimentTracker::from_config(&config).unwrap();
        let experiment = tracker.get_or_create_experiment(&config.experiment_name).unwrap();
        let pipeline = TrainedPipeline::fit(ModelType::LogisticRegression, &TrainingConfig::default(), &heart_df(30)).unwrap();
        log_run(&tracker, &experiment.experiment_id, 0.7, &pipeline);
        experiment.experiment_id
    };

    let reopened = ExperimentTracker::from_config(&config).unwrap();
    let experiment = reopened.get_or_create_experiment("exp").unwrap();
    assert_eq!(experiment.experiment_id, experiment_id);
    assert_eq!(reopened.search_runs(&experiment_id).unwrap().len(), 1);
    assert!(load_best_pipeline(&reopened, "exp").is_ok());
}
