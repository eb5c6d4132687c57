//! Cardio MLOps - heart-disease risk classification
//!
//! This crate covers the whole lifecycle of a small clinical classifier:
//! - Fetching and cleaning the UCI Cleveland dataset
//! - Standardization and model training (logistic regression, random forest)
//! - Experiment tracking in a local directory store
//! - Selecting the best run and serving it over HTTP
//! - An interactive terminal client
//!
//! # Modules
//!
//! ## Data and Models
//! - [`data`] - Dataset preparation, validation and exploratory plots
//! - [`features`] - Canonical feature schema and the patient record
//! - [`preprocessing`] - Feature standardization
//! - [`training`] - Classifiers, metrics and the tracked training pipeline
//!
//! ## Lifecycle
//! - [`tracking`] - Experiments, runs, artifacts and the inference log
//! - [`registry`] - Best-run selection and model loading
//!
//! ## Services
//! - [`server`] - HTTP prediction service
//! - [`client`] - Prediction client and terminal form
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data and models
pub mod data;
pub mod features;
pub mod preprocessing;
pub mod training;

// Lifecycle
pub mod registry;
pub mod tracking;

// Services
pub mod cli;
pub mod client;
pub mod server;

pub use error::{CardioError, Result};
pub use features::PatientRecord;
