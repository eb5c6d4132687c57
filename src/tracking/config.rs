//! Tracking store location and experiment name

use crate::error::{CardioError, Result};
use std::path::PathBuf;

/// Default experiment shared by training and serving
pub const DEFAULT_EXPERIMENT_NAME: &str = "Heart Disease Prediction";

/// Where runs are recorded and which experiment they belong to
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    /// Directory store location, optionally with a `file:` scheme
    pub tracking_uri: String,
    pub experiment_name: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_uri: std::env::var("TRACKING_URI").unwrap_or_else(|_| "./mlruns".to_string()),
            experiment_name: std::env::var("EXPERIMENT_NAME")
                .unwrap_or_else(|_| DEFAULT_EXPERIMENT_NAME.to_string()),
        }
    }
}

impl TrackingConfig {
    pub fn new(tracking_uri: impl Into<String>, experiment_name: impl Into<String>) -> Self {
        Self {
            tracking_uri: tracking_uri.into(),
            experiment_name: experiment_name.into(),
        }
    }

    /// Local directory behind `tracking_uri`.
    ///
    /// Accepts plain paths, `file:<path>` and `file://<path>`. Any other
    /// scheme is a configuration error.
    pub fn root_dir(&self) -> Result<PathBuf> {
        let uri = self.tracking_uri.trim();
        if uri.is_empty() {
            return Err(CardioError::ConfigError("tracking URI is empty".to_string()));
        }

        let path = if let Some(rest) = uri.strip_prefix("file://") {
            rest
        } else if let Some(rest) = uri.strip_prefix("file:") {
            rest
        } else if let Some((scheme, _)) = uri.split_once("://") {
            return Err(CardioError::ConfigError(format!(
                "unsupported tracking URI scheme '{}', only local directories are supported",
                scheme
            )));
        } else {
            uri
        };

        if path.is_empty() {
            return Err(CardioError::ConfigError(format!("tracking URI '{}' has no path", uri)));
        }

        Ok(PathBuf::from(path))
    }
}
