//! Experiment Tracker Implementation
//!
//! Records experiments, runs, params, metrics and artifacts in a
//! [`StorageBackend`]. Layout relative to the backend root:
//!
//! ```text
//! <experiment_id>/meta.json
//! <experiment_id>/inference.jsonl
//! <experiment_id>/<run_id>/meta.json
//! <experiment_id>/<run_id>/params.json
//! <experiment_id>/<run_id>/metrics.json
//! <experiment_id>/<run_id>/artifacts/<path>
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::TrackingConfig;
use super::storage::{LocalStorage, StorageBackend};
use crate::error::{CardioError, Result};

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// Run is currently running
    Running,
    /// Run completed successfully
    Finished,
    /// Run failed
    Failed,
}

/// A named group of runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    /// Creation time, milliseconds since the epoch
    pub created_at: i64,
}

/// A single training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub experiment_id: String,
    /// Milliseconds since the epoch
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    /// Artifact paths relative to the run's artifact directory
    pub artifacts: Vec<String>,
}

impl Run {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Run duration in seconds, up to now if still running
    pub fn duration_secs(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(now_millis);
        (end - self.start_time) as f64 / 1000.0
    }
}

/// One line of an experiment's inference log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub run_id: String,
    pub prediction: i32,
    pub confidence: f64,
}

/// Run fields stored in `meta.json`; params and metrics live in their own files
#[derive(Serialize, Deserialize)]
struct RunMeta {
    run_id: String,
    run_name: String,
    experiment_id: String,
    start_time: i64,
    end_time: Option<i64>,
    status: RunStatus,
    #[serde(default)]
    artifacts: Vec<String>,
}

/// Experiment tracker
#[derive(Clone)]
pub struct ExperimentTracker {
    storage: Arc<dyn StorageBackend>,
    create_lock: Arc<Mutex<()>>,
}

impl ExperimentTracker {
    /// Create a tracker over an existing backend
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Tracker over a local directory store
    pub fn with_dir(output_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(Arc::new(LocalStorage::new(output_dir)?)))
    }

    /// Tracker for the store named by `config.tracking_uri`
    pub fn from_config(config: &TrackingConfig) -> Result<Self> {
        Self::with_dir(config.root_dir()?)
    }

    pub fn location(&self) -> String {
        self.storage.location()
    }

    /// All experiments, ordered by id
    pub fn list_experiments(&self) -> Result<Vec<Experiment>> {
        let mut experiments = Vec::new();
        for dir in self.storage.list_dirs("")? {
            let key = format!("{}/meta.json", dir);
            if !self.storage.exists(&key) {
                continue;
            }
            experiments.push(self.read_json::<Experiment>(&key)?);
        }
        experiments.sort_by_key(|e| e.experiment_id.parse::<u64>().unwrap_or(u64::MAX));
        Ok(experiments)
    }

    pub fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        Ok(self.list_experiments()?.into_iter().find(|e| e.name == name))
    }

    /// Look up an experiment by name, creating it with the next sequential id
    pub fn get_or_create_experiment(&self, name: &str) -> Result<Experiment> {
        let _guard = self.create_lock.lock();

        let experiments = self.list_experiments()?;
        if let Some(existing) = experiments.iter().find(|e| e.name == name) {
            return Ok(existing.clone());
        }

        let next_id = experiments
            .iter()
            .filter_map(|e| e.experiment_id.parse::<u64>().ok())
            .max()
            .map_or(1, |id| id + 1);

        let experiment = Experiment {
            experiment_id: next_id.to_string(),
            name: name.to_string(),
            created_at: now_millis(),
        };
        self.write_json(&format!("{}/meta.json", experiment.experiment_id), &experiment)?;

        info!(
            experiment_id = %experiment.experiment_id,
            name = %experiment.name,
            store = %self.location(),
            "Created experiment"
        );
        Ok(experiment)
    }

    /// Start a new run
    pub fn start_run(&self, experiment_id: &str, run_name: impl Into<String>) -> Result<Run> {
        let run = Run {
            run_id: uuid::Uuid::new_v4().simple().to_string(),
            run_name: run_name.into(),
            experiment_id: experiment_id.to_string(),
            start_time: now_millis(),
            end_time: None,
            status: RunStatus::Running,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
        };

        self.write_meta(&run)?;
        self.write_json(&run_key(&run, "params.json"), &run.params)?;
        self.write_json(&run_key(&run, "metrics.json"), &run.metrics)?;

        debug!(run_id = %run.run_id, run_name = %run.run_name, "Started run");
        Ok(run)
    }

    /// Log multiple parameters
    pub fn log_params(&self, run: &mut Run, params: BTreeMap<String, String>) -> Result<()> {
        run.params.extend(params);
        self.write_json(&run_key(run, "params.json"), &run.params)
    }

    /// Log multiple metrics; later values for a name replace earlier ones
    pub fn log_metrics(&self, run: &mut Run, metrics: BTreeMap<String, f64>) -> Result<()> {
        run.metrics.extend(metrics);
        self.write_json(&run_key(run, "metrics.json"), &run.metrics)
    }

    /// Store `bytes` under the run's artifact directory
    pub fn log_artifact(&self, run: &mut Run, path: &str, bytes: &[u8]) -> Result<()> {
        self.storage.write(&run_key(run, &format!("artifacts/{}", path)), bytes)?;
        if !run.artifacts.iter().any(|a| a == path) {
            run.artifacts.push(path.to_string());
        }
        self.write_meta(run)
    }

    /// Read an artifact previously stored with [`ExperimentTracker::log_artifact`]
    pub fn load_artifact(&self, run: &Run, path: &str) -> Result<Vec<u8>> {
        self.storage.read(&run_key(run, &format!("artifacts/{}", path)))
    }

    /// End the run with the given status
    pub fn end_run(&self, run: &mut Run, status: RunStatus) -> Result<()> {
        run.end_time = Some(now_millis());
        run.status = status;
        self.write_meta(run)?;

        info!(
            run_id = %run.run_id,
            run_name = %run.run_name,
            status = ?status,
            duration_secs = run.duration_secs(),
            "Run ended"
        );
        Ok(())
    }

    /// All runs of an experiment, most recent first
    pub fn search_runs(&self, experiment_id: &str) -> Result<Vec<Run>> {
        let mut runs = Vec::new();

        for dir in self.storage.list_dirs(experiment_id)? {
            let meta_key = format!("{}/{}/meta.json", experiment_id, dir);
            if !self.storage.exists(&meta_key) {
                continue;
            }
            match self.read_run(experiment_id, &dir) {
                Ok(run) => runs.push(run),
                Err(e) => warn!(run_dir = %dir, error = %e, "Skipping unreadable run"),
            }
        }

        runs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(runs)
    }

    /// Append a record to the experiment's inference log
    pub fn log_inference(&self, experiment_id: &str, record: &InferenceRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.storage
            .append_line(&format!("{}/inference.jsonl", experiment_id), &line)
    }

    /// Every record in the experiment's inference log, oldest first
    pub fn read_inference_log(&self, experiment_id: &str) -> Result<Vec<InferenceRecord>> {
        let key = format!("{}/inference.jsonl", experiment_id);
        if !self.storage.exists(&key) {
            return Ok(Vec::new());
        }

        let bytes = self.storage.read(&key)?;
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(CardioError::from))
            .collect()
    }

    fn read_run(&self, experiment_id: &str, run_dir: &str) -> Result<Run> {
        let prefix = format!("{}/{}", experiment_id, run_dir);
        let meta: RunMeta = self.read_json(&format!("{}/meta.json", prefix))?;

        let params_key = format!("{}/params.json", prefix);
        let params = if self.storage.exists(&params_key) {
            self.read_json(&params_key)?
        } else {
            BTreeMap::new()
        };

        let metrics_key = format!("{}/metrics.json", prefix);
        let metrics = if self.storage.exists(&metrics_key) {
            self.read_json(&metrics_key)?
        } else {
            BTreeMap::new()
        };

        Ok(Run {
            run_id: meta.run_id,
            run_name: meta.run_name,
            experiment_id: meta.experiment_id,
            start_time: meta.start_time,
            end_time: meta.end_time,
            status: meta.status,
            params,
            metrics,
            artifacts: meta.artifacts,
        })
    }

    fn write_meta(&self, run: &Run) -> Result<()> {
        let meta = RunMeta {
            run_id: run.run_id.clone(),
            run_name: run.run_name.clone(),
            experiment_id: run.experiment_id.clone(),
            start_time: run.start_time,
            end_time: run.end_time,
            status: run.status,
            artifacts: run.artifacts.clone(),
        };
        self.write_json(&run_key(run, "meta.json"), &meta)
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.storage.write(key, &serde_json::to_vec_pretty(value)?)
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<T> {
        Ok(serde_json::from_slice(&self.storage.read(key)?)?)
    }
}

fn run_key(run: &Run, file: &str) -> String {
    format!("{}/{}/{}", run.experiment_id, run.run_id, file)
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
