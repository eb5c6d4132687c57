//! Column-wise standard scaling

use crate::error::{CardioError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Statistics learned for one column during fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnParams {
    name: String,
    mean: f64,
    /// Population standard deviation, 1.0 for constant columns
    scale: f64,
}

/// Standardizes a declared, ordered set of numeric columns to zero mean and
/// unit variance.
///
/// Output frames contain exactly the declared columns, in declared order.
/// Positional inputs ([`StandardScaler::transform_array`]) must follow the same
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    params: Vec<ColumnParams>,
    is_fitted: bool,
}

impl StandardScaler {
    /// Create an unfitted scaler over `columns`
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Declared columns, in output order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learned `(mean, scale)` per column, in declared order
    pub fn statistics(&self) -> Vec<(f64, f64)> {
        self.params.iter().map(|p| (p.mean, p.scale)).collect()
    }

    /// Learn per-column statistics from `df`.
    ///
    /// Refitting replaces the previous statistics entirely.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.check_schema(df)?;

        let params = self
            .columns
            .iter()
            .map(|name| {
                let values = numeric_column(df, name)?;
                let mean = values.mean().unwrap_or(0.0);
                let std = values.std(0).unwrap_or(1.0);
                Ok(ColumnParams {
                    name: name.clone(),
                    mean,
                    scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Apply fit-time statistics to `df`
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(CardioError::ModelNotFitted);
        }
        self.check_schema(df)?;

        let columns = self
            .params
            .iter()
            .map(|params| {
                let values = numeric_column(df, &params.name)?;
                let scaled: Float64Chunked = values
                    .into_iter()
                    .map(|opt| opt.map(|v| (v - params.mean) / params.scale))
                    .collect();
                Ok(scaled.with_name(params.name.as_str().into()).into_series().into())
            })
            .collect::<Result<Vec<Column>>>()?;

        Ok(DataFrame::new(columns)?)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Undo the scaling of a frame produced by [`StandardScaler::transform`]
    pub fn inverse_transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(CardioError::ModelNotFitted);
        }
        self.check_schema(df)?;

        let columns = self
            .params
            .iter()
            .map(|params| {
                let values = numeric_column(df, &params.name)?;
                let unscaled: Float64Chunked = values
                    .into_iter()
                    .map(|opt| opt.map(|v| v * params.scale + params.mean))
                    .collect();
                Ok(unscaled.with_name(params.name.as_str().into()).into_series().into())
            })
            .collect::<Result<Vec<Column>>>()?;

        Ok(DataFrame::new(columns)?)
    }

    /// Scale a positional matrix whose columns follow the declared order
    pub fn transform_array(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(CardioError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(CardioError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.to_owned();
        for (mut column, params) in out.columns_mut().into_iter().zip(&self.params) {
            column.mapv_inplace(|v| (v - params.mean) / params.scale);
        }
        Ok(out)
    }

    fn check_schema(&self, df: &DataFrame) -> Result<()> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !present.contains(c))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CardioError::SchemaMismatch { missing })
        }
    }
}

/// Column `name` of `df` as f64 values, casting integer columns
fn numeric_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let column = df
        .column(name)
        .map_err(|_| CardioError::FeatureNotFound(name.to_string()))?;
    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| CardioError::PreprocessingError(e.to_string()))?;
    let values = series
        .f64()
        .map_err(|e| CardioError::PreprocessingError(e.to_string()))?
        .clone();
    Ok(values)
}
