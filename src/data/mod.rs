//! Dataset loading, validation and preparation

mod plots;
mod prepare;

pub use plots::{correlation_matrix, render_plots, PlotPaths};
pub use prepare::{clean, fetch_raw, parse_raw, prepare_dataset, PrepareSummary, RawSource, RAW_COLUMNS, UCI_CLEVELAND_URL};

use crate::error::{CardioError, Result};
use crate::features::{FEATURE_COLUMNS, TARGET_COLUMN};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Where `prepare` writes and `train` reads the cleaned dataset
pub const DEFAULT_DATASET_PATH: &str = "data/heart.csv";

/// Load a CSV file with a header row
pub fn load_dataset(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| CardioError::DataError(format!("cannot open {}: {}", path.display(), e)))?;

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| CardioError::DataError(format!("cannot parse {}: {}", path.display(), e)))
}

/// Write `df` as CSV, creating parent directories
pub fn write_dataset(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| CardioError::DataError(e.to_string()))
}

/// Check that `features` and `target` exist, hold no nulls, and that the
/// target only takes the values 0 and 1
pub fn validate_columns<S: AsRef<str>>(df: &DataFrame, features: &[S], target: &str) -> Result<()> {
    if df.height() == 0 {
        return Err(CardioError::DataError("dataset is empty".to_string()));
    }

    let missing: Vec<&str> = features
        .iter()
        .map(|f| f.as_ref())
        .chain(std::iter::once(target))
        .filter(|name| df.column(name).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(CardioError::DataError(format!("missing columns: {}", missing.join(", "))));
    }

    for name in features.iter().map(|f| f.as_ref()).chain(std::iter::once(target)) {
        // unparseable strings become nulls under the cast
        let values = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        if values.null_count() > 0 {
            return Err(CardioError::DataError(format!(
                "column '{}' has {} missing or non-numeric values",
                name,
                values.null_count()
            )));
        }
    }

    let target_values = df
        .column(target)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let invalid = target_values
        .f64()?
        .into_iter()
        .flatten()
        .find(|v| *v != 0.0 && *v != 1.0);
    if let Some(v) = invalid {
        return Err(CardioError::DataError(format!(
            "target column '{}' must be 0 or 1, found {}",
            target, v
        )));
    }

    Ok(())
}

/// Validate a prepared dataset against the canonical schema
pub fn validate_dataset(df: &DataFrame) -> Result<()> {
    validate_columns(df, &FEATURE_COLUMNS, TARGET_COLUMN)
}
