//! Integration test: tracked training end-to-end

use cardio_mlops::features::{FEATURE_COLUMNS, TARGET_COLUMN};
use cardio_mlops::tracking::{ExperimentTracker, RunStatus};
use cardio_mlops::training::{
    ModelType, TrainedPipeline, TrainingConfig, TrainingPipeline, MODEL_ARTIFACT_PATH,
};
use cardio_mlops::CardioError;
use polars::prelude::*;

/// Rows whose first features separate the classes, the rest is noise
fn heart_df(n: usize) -> DataFrame {
    let mut columns: Vec<Column> = FEATURE_COLUMNS
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = (0..n)
                .map(|i| {
                    let label = if i % 3 == 0 { 1.0 } else { 0.0 };
                    let noise = ((i * 13 + j * 5) % 17) as f64 / 17.0;
                    if j < 3 { label * 1.5 + noise } else { noise * 10.0 }
                })
                .collect();
            Column::new((*name).into(), values)
        })
        .collect();
    let target: Vec<i64> = (0..n).map(|i| if i % 3 == 0 { 1 } else { 0 }).collect();
    columns.push(Column::new(TARGET_COLUMN.into(), target));
    DataFrame::new(columns).unwrap()
}

fn small_config() -> TrainingConfig {
    TrainingConfig::default().with_n_estimators(25)
}

#[test]
fn test_training_logs_one_run_per_family() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
    let report = TrainingPipeline::new(small_config(), tracker.clone())
        .with_experiment_name("heart")
        .run_frame(&heart_df(90))
        .unwrap();

    assert_eq!(report.runs.len(), ModelType::all().len());
    assert_eq!(report.n_failed(), 0);
    assert_eq!(report.n_train + report.n_test, 90);

    let runs = tracker.search_runs(&report.experiment_id).unwrap();
    assert_eq!(runs.len(), 2);
    for run in &runs {
        assert_eq!(run.status, RunStatus::Finished);
        for metric in ["accuracy", "precision", "recall", "f1", "roc_auc"] {
            let value = run.metric(metric).unwrap_or_else(|| panic!("missing {}", metric));
            assert!((0.0..=1.0).contains(&value), "{} out of range: {}", metric, value);
        }
        assert!(run.artifacts.iter().any(|a| a == MODEL_ARTIFACT_PATH));
        assert_eq!(run.params.get("random_state").map(String::as_str), Some("42"));
    }
}

#[test]
fn test_separable_data_scores_well() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
    let report = TrainingPipeline::new(small_config(), tracker)
        .run_frame(&heart_df(120))
        .unwrap();

    let best = report.best().unwrap();
    assert!(best.metrics.as_ref().unwrap().roc_auc > 0.9);
}

#[test]
fn test_fixed_seed_reproduces_metrics() {
    let df = heart_df(90);
    let metrics = |seed: u64| {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
        TrainingPipeline::new(small_config().with_random_state(seed), tracker)
            .run_frame(&df)
            .unwrap()
            .runs
            .into_iter()
            .map(|r| r.metrics.unwrap())
            .collect::<Vec<_>>()
    };

    assert_eq!(metrics(7), metrics(7));
}

#[test]
fn test_artifact_reloads_to_same_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
    let df = heart_df(60);
    let report = TrainingPipeline::new(small_config().with_models(vec![ModelType::RandomForest]), tracker.clone())
        .run_frame(&df)
        .unwrap();

    let runs = tracker.search_runs(&report.experiment_id).unwrap();
    let bytes = tracker.load_artifact(&runs[0], MODEL_ARTIFACT_PATH).unwrap();
    let restored = TrainedPipeline::from_bytes(&bytes).unwrap();

    let direct = TrainedPipeline::fit(ModelType::RandomForest, &small_config(), &df).unwrap();
    assert_eq!(restored.feature_names(), direct.feature_names());
    let probs = restored.predict_proba_frame(&df).unwrap();
    assert_eq!(probs.len(), 60);
    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_training_from_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("heart.csv");
    let mut df = heart_df(60);
    cardio_mlops::data::write_dataset(&mut df, &csv_path).unwrap();

    let tracker = ExperimentTracker::with_dir(dir.path().join("mlruns")).unwrap();
    let report = TrainingPipeline::new(small_config(), tracker).run(&csv_path).unwrap();
    assert_eq!(report.runs.len(), 2);
}

#[test]
fn test_missing_dataset_is_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
    let result = TrainingPipeline::new(small_config(), tracker).run(dir.path().join("absent.csv"));
    assert!(matches!(result, Err(CardioError::DataError(_))));
}

#[test]
fn test_non_binary_target_is_rejected() {
    let mut df = heart_df(30);
    let bad: Vec<i64> = (0..30).map(|i| (i % 4) as i64).collect();
    df.with_column(Column::new(TARGET_COLUMN.into(), bad)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
    let err = TrainingPipeline::new(small_config(), tracker).run_frame(&df).unwrap_err();
    assert!(err.to_string().contains("must be 0 or 1"));
}
