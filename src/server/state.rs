//! Service state built once at startup

use crate::error::Result;
use crate::registry::{load_best_pipeline, LoadedModel};
use crate::tracking::{ExperimentTracker, InferenceRecord, TrackingConfig};
use crate::training::TrainedPipeline;

use super::ServerConfig;

/// Appends prediction records to the experiment's inference log
#[derive(Clone)]
pub struct InferenceLogger {
    tracker: ExperimentTracker,
    experiment_id: String,
}

impl InferenceLogger {
    pub fn new(tracker: ExperimentTracker, experiment_id: impl Into<String>) -> Self {
        Self {
            tracker,
            experiment_id: experiment_id.into(),
        }
    }

    pub fn log(&self, record: &InferenceRecord) -> Result<()> {
        self.tracker.log_inference(&self.experiment_id, record)
    }
}

/// Everything a request handler needs. Immutable after construction.
pub struct ServiceContext {
    pub pipeline: TrainedPipeline,
    pub run_id: String,
    pub run_name: String,
    pub experiment_name: String,
    pub config: ServerConfig,
    pub inference_logger: Option<InferenceLogger>,
}

impl ServiceContext {
    /// Context serving `pipeline` as the model of `run_id`
    pub fn new(pipeline: TrainedPipeline, run_id: impl Into<String>, config: ServerConfig) -> Self {
        Self {
            pipeline,
            run_id: run_id.into(),
            run_name: String::new(),
            experiment_name: String::new(),
            config,
            inference_logger: None,
        }
    }

    /// Context around a model loaded from the registry
    pub fn from_loaded(loaded: LoadedModel, config: ServerConfig) -> Self {
        Self {
            pipeline: loaded.pipeline,
            run_id: loaded.run.run_id,
            run_name: loaded.run.run_name,
            experiment_name: loaded.experiment.name,
            config,
            inference_logger: None,
        }
    }

    pub fn with_inference_logger(mut self, logger: InferenceLogger) -> Self {
        self.inference_logger = Some(logger);
        self
    }

    /// Load the best run of the configured experiment. Inference logging is
    /// attached when `config.log_inference` is set.
    pub fn load(tracking: &TrackingConfig, config: ServerConfig) -> Result<Self> {
        let tracker = ExperimentTracker::from_config(tracking)?;
        let loaded = load_best_pipeline(&tracker, &tracking.experiment_name)?;
        let experiment_id = loaded.experiment.experiment_id.clone();
        let log_inference = config.log_inference;

        let context = Self::from_loaded(loaded, config);
        Ok(if log_inference {
            context.with_inference_logger(InferenceLogger::new(tracker, experiment_id))
        } else {
            context
        })
    }
}
