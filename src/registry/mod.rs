//! Model registry
//!
//! Picks the best finished run of an experiment and loads its pipeline.

use crate::error::{CardioError, Result};
use crate::tracking::{Experiment, ExperimentTracker, Run, RunStatus};
use crate::training::{TrainedPipeline, MODEL_ARTIFACT_PATH};
use std::cmp::Ordering;
use tracing::info;

/// Metric used to rank runs
pub const SELECTION_METRIC: &str = "roc_auc";

/// Pipeline loaded from the selected run
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub experiment: Experiment,
    pub run: Run,
    pub pipeline: TrainedPipeline,
}

/// Best run by ROC-AUC.
///
/// Only finished runs with a finite `roc_auc` are candidates. Equal scores go
/// to the most recently started run.
pub fn select_best(runs: &[Run]) -> Result<&Run> {
    runs.iter()
        .filter(|r| r.status == RunStatus::Finished)
        .filter_map(|r| r.metric(SELECTION_METRIC).filter(|v| v.is_finite()).map(|v| (r, v)))
        .max_by(|(a, a_auc), (b, b_auc)| {
            a_auc
                .partial_cmp(b_auc)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.start_time.cmp(&b.start_time))
        })
        .map(|(r, _)| r)
        .ok_or_else(|| CardioError::NotFound(format!("no finished run with a {} metric", SELECTION_METRIC)))
}

/// Resolve `experiment_name`, select its best run and deserialize the
/// pipeline artifact
pub fn load_best_pipeline(tracker: &ExperimentTracker, experiment_name: &str) -> Result<LoadedModel> {
    let experiment = tracker
        .get_experiment_by_name(experiment_name)?
        .ok_or_else(|| {
            CardioError::NotFound(format!(
                "experiment '{}' in {}",
                experiment_name,
                tracker.location()
            ))
        })?;

    let runs = tracker.search_runs(&experiment.experiment_id)?;
    if runs.is_empty() {
        return Err(CardioError::NotFound(format!(
            "no runs in experiment '{}'",
            experiment_name
        )));
    }

    let run = select_best(&runs)?.clone();
    let bytes = tracker.load_artifact(&run, MODEL_ARTIFACT_PATH)?;
    let pipeline = TrainedPipeline::from_bytes(&bytes)?;

    info!(
        experiment = %experiment.name,
        run_id = %run.run_id,
        run_name = %run.run_name,
        roc_auc = run.metric(SELECTION_METRIC).unwrap_or(f64::NAN),
        "Loaded best model"
    );

    Ok(LoadedModel {
        experiment,
        run,
        pipeline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn run(id: &str, start_time: i64, status: RunStatus, auc: Option<f64>) -> Run {
        let mut metrics = BTreeMap::new();
        if let Some(auc) = auc {
            metrics.insert("roc_auc".to_string(), auc);
        }
        Run {
            run_id: id.to_string(),
            run_name: id.to_string(),
            experiment_id: "1".to_string(),
            start_time,
            end_time: Some(start_time + 10),
            status,
            params: BTreeMap::new(),
            metrics,
            artifacts: Vec::new(),
        }
    }

    #[test]
    fn test_selects_highest_auc() {
        let runs = vec![
            run("a", 1, RunStatus::Finished, Some(0.71)),
            run("b", 2, RunStatus::Finished, Some(0.82)),
            run("c", 3, RunStatus::Finished, Some(0.65)),
        ];
        assert_eq!(select_best(&runs).unwrap().run_id, "b");
    }

    #[test]
    fn test_tie_goes_to_most_recent() {
        let runs = vec![
            run("old", 1, RunStatus::Finished, Some(0.9)),
            run("new", 5, RunStatus::Finished, Some(0.9)),
            run("mid", 3, RunStatus::Finished, Some(0.9)),
        ];
        assert_eq!(select_best(&runs).unwrap().run_id, "new");
    }

    #[test]
    fn test_ignores_failed_and_unscored_runs() {
        let runs = vec![
            run("failed", 1, RunStatus::Failed, Some(0.99)),
            run("running", 2, RunStatus::Running, Some(0.98)),
            run("nan", 3, RunStatus::Finished, Some(f64::NAN)),
            run("none", 4, RunStatus::Finished, None),
            run("ok", 5, RunStatus::Finished, Some(0.6)),
        ];
        assert_eq!(select_best(&runs).unwrap().run_id, "ok");
    }

    #[test]
    fn test_empty_is_not_found() {
        assert!(matches!(select_best(&[]), Err(CardioError::NotFound(_))));

        let runs = vec![run("failed", 1, RunStatus::Failed, Some(0.9))];
        assert!(matches!(select_best(&runs), Err(CardioError::NotFound(_))));
    }

    #[test]
    fn test_missing_experiment_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
        assert!(matches!(
            load_best_pipeline(&tracker, "nope"),
            Err(CardioError::NotFound(_))
        ));
    }

    #[test]
    fn test_experiment_without_runs_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
        tracker.get_or_create_experiment("empty").unwrap();
        assert!(matches!(
            load_best_pipeline(&tracker, "empty"),
            Err(CardioError::NotFound(_))
        ));
    }
}
