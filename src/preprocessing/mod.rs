//! Data preprocessing module
//!
//! Builds the numeric standardization transform that sits in front of every
//! classifier, and converts polars frames into the dense matrices the models
//! consume.

mod scaler;

pub use scaler::StandardScaler;

use crate::error::{CardioError, Result};
use ndarray::Array2;
use polars::prelude::*;

/// Build the preprocessing transform for the given numerical features.
///
/// The returned scaler is unfitted; fitting it on a frame that lacks any of
/// `numerical_features` fails with [`CardioError::SchemaMismatch`].
pub fn build_preprocessor<S: AsRef<str>>(numerical_features: &[S]) -> StandardScaler {
    StandardScaler::new(numerical_features)
}

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`.
///
/// Null values are rejected rather than silently filled.
pub fn columns_to_array2<S: AsRef<str>>(df: &DataFrame, col_names: &[S]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let col_name = col_name.as_ref();
            let column = df
                .column(col_name)
                .map_err(|_| CardioError::FeatureNotFound(col_name.to_string()))?;
            let series = column
                .as_materialized_series()
                .cast(&DataType::Float64)
                .map_err(|e| CardioError::DataError(e.to_string()))?;
            series
                .f64()
                .map_err(|e| CardioError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| {
                    v.ok_or_else(|| {
                        CardioError::DataError(format!("column '{}' contains null values", col_name))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_data[c][r]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_preprocessor_shape() {
        let features = ["age", "chol", "trestbps"];
        let mut preprocessor = build_preprocessor(&features);

        let df = df!(
            "age" => &[50, 60],
            "chol" => &[200, 240],
            "trestbps" => &[120, 140]
        )
        .unwrap();

        let transformed = preprocessor.fit_transform(&df).unwrap();
        assert_eq!(transformed.height(), df.height());
        assert_eq!(transformed.width(), features.len());
    }

    #[test]
    fn test_fit_once_transform_twice_is_identical() {
        let df = df!(
            "age" => &[50.0, 60.0, 70.0],
            "sex" => &[1.0, 0.0, 1.0],
            "chol" => &[200.0, 180.0, 260.0]
        )
        .unwrap();

        let mut preprocessor = build_preprocessor(&["age", "sex", "chol"]);
        preprocessor.fit(&df).unwrap();

        let first = preprocessor.transform(&df).unwrap();
        let second = preprocessor.transform(&df).unwrap();
        assert!(first.equals(&second));
    }

    #[test]
    fn test_columns_to_array2_ordering() {
        let df = df!(
            "a" => &[1.0, 2.0],
            "b" => &[10i64, 20]
        )
        .unwrap();

        let x = columns_to_array2(&df, &["b", "a"]).unwrap();
        assert_eq!(x, ndarray::array![[10.0, 1.0], [20.0, 2.0]]);
    }

    #[test]
    fn test_columns_to_array2_rejects_nulls() {
        let df = df!("a" => &[Some(1.0), None]).unwrap();
        assert!(matches!(columns_to_array2(&df, &["a"]), Err(CardioError::DataError(_))));
    }
}
