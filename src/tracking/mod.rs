//! Experiment tracking
//!
//! Directory-backed store for experiments, runs and their artifacts, shared by
//! the training pipeline (writer) and the prediction service (reader).

mod config;
mod storage;
mod tracker;

pub use config::{TrackingConfig, DEFAULT_EXPERIMENT_NAME};
pub use storage::{LocalStorage, StorageBackend};
pub use tracker::{Experiment, ExperimentTracker, InferenceRecord, Run, RunStatus};
