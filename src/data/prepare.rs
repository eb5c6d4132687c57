//! Raw UCI heart-disease data to the cleaned training CSV

use super::write_dataset;
use crate::error::{CardioError, Result};
use crate::features::{FEATURE_COLUMNS, TARGET_COLUMN};
use polars::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Processed Cleveland file of the UCI heart-disease dataset
pub const UCI_CLEVELAND_URL: &str =
    "https://archive.ics.uci.edu/ml/machine-learning-databases/heart-disease/processed.cleveland.data";

/// Field order of the raw file: the 13 features followed by the diagnosis
pub const RAW_COLUMNS: [&str; 14] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal", "num",
];

const MISSING_MARKER: &str = "?";

/// Location of the raw data
#[derive(Debug, Clone, PartialEq)]
pub enum RawSource {
    Url(String),
    File(PathBuf),
}

impl RawSource {
    /// `http(s)://` strings are URLs, anything else a local path
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            RawSource::Url(source.to_string())
        } else {
            RawSource::File(PathBuf::from(source))
        }
    }
}

impl Default for RawSource {
    fn default() -> Self {
        RawSource::Url(UCI_CLEVELAND_URL.to_string())
    }
}

impl std::fmt::Display for RawSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawSource::Url(url) => write!(f, "{}", url),
            RawSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Counts reported after preparing a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepareSummary {
    pub raw_rows: usize,
    pub dropped_rows: usize,
    pub rows: usize,
    pub positives: usize,
    pub output: PathBuf,
}

/// Fetch the raw file contents
pub async fn fetch_raw(source: &RawSource) -> Result<String> {
    match source {
        RawSource::Url(url) => {
            info!(url = %url, "Downloading raw dataset");
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()?;
            let response = client.get(url).send().await?.error_for_status()?;
            Ok(response.text().await?)
        }
        RawSource::File(path) => {
            info!(path = %path.display(), "Reading raw dataset");
            Ok(tokio::fs::read_to_string(path).await?)
        }
    }
}

/// Parse headerless comma-separated rows of [`RAW_COLUMNS`]. `?` marks a
/// missing value and becomes null.
pub fn parse_raw(text: &str) -> Result<DataFrame> {
    let schema: Schema = RAW_COLUMNS
        .iter()
        .map(|name| Field::new((*name).into(), DataType::Float64))
        .collect();

    let parse_opts = CsvParseOptions::default()
        .with_null_values(Some(NullValues::AllColumnsSingle(MISSING_MARKER.into())));

    CsvReadOptions::default()
        .with_has_header(false)
        .with_schema(Some(Arc::new(schema)))
        .with_parse_options(parse_opts)
        .into_reader_with_file_handle(std::io::Cursor::new(text.as_bytes()))
        .finish()
        .map_err(|e| CardioError::DataError(format!("cannot parse raw data: {}", e)))
}

/// Drop rows with any missing value and replace `num` by the binary `target`
pub fn clean(raw: &DataFrame) -> Result<DataFrame> {
    let mut mask = BooleanChunked::full("complete".into(), true, raw.height());
    for column in raw.get_columns() {
        mask = &mask & &column.as_materialized_series().is_not_null();
    }
    let complete = raw.filter(&mask)?;

    let num = complete
        .column("num")
        .map_err(|_| CardioError::FeatureNotFound("num".to_string()))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let target: Int64Chunked = num
        .f64()?
        .into_iter()
        .map(|v| v.map(|x| if x > 0.0 { 1 } else { 0 }))
        .collect();

    let mut columns = FEATURE_COLUMNS
        .iter()
        .map(|name| {
            complete
                .column(name)
                .map_err(|_| CardioError::FeatureNotFound(name.to_string()))?
                .cast(&DataType::Float64)
                .map_err(CardioError::from)
        })
        .collect::<Result<Vec<Column>>>()?;
    columns.push(target.with_name(TARGET_COLUMN.into()).into_series().into());

    Ok(DataFrame::new(columns)?)
}

/// Fetch, parse, clean and write the dataset to `output`
pub async fn prepare_dataset(source: &RawSource, output: impl AsRef<Path>) -> Result<PrepareSummary> {
    let text = fetch_raw(source).await?;
    let raw = parse_raw(&text)?;
    let mut cleaned = clean(&raw)?;

    let dropped_rows = raw.height() - cleaned.height();
    if dropped_rows > 0 {
        warn!(dropped_rows, "Dropped rows with missing values");
    }
    if cleaned.height() == 0 {
        return Err(CardioError::DataError(format!("no complete rows in {}", source)));
    }

    super::validate_dataset(&cleaned)?;

    let positives = cleaned
        .column(TARGET_COLUMN)?
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| *v > 0.5)
        .count();

    let output = output.as_ref().to_path_buf();
    write_dataset(&mut cleaned, &output)?;

    let summary = PrepareSummary {
        raw_rows: raw.height(),
        dropped_rows,
        rows: cleaned.height(),
        positives,
        output,
    };
    info!(
        rows = summary.rows,
        positives = summary.positives,
        output = %summary.output.display(),
        "Dataset prepared"
    );
    Ok(summary)
}
