//! Canonical feature schema and the typed patient record
//!
//! The trained pipeline is positional: every row handed to it must follow
//! [`FEATURE_COLUMNS`] exactly, so rows are only ever built from that list.

use crate::error::{CardioError, Result};
use ndarray::Array2;
use serde::{Deserialize, Deserializer, Serialize};

/// Feature columns in the order the pipeline expects them
pub const FEATURE_COLUMNS: [&str; 13] = [
    "age",
    "sex",
    "cp",
    "trestbps",
    "chol",
    "fbs",
    "restecg",
    "thalach",
    "exang",
    "oldpeak",
    "slope",
    "ca",
    "thal",
];

/// Name of the binary label column in the prepared dataset
pub const TARGET_COLUMN: &str = "target";

/// Number of canonical features
pub const N_FEATURES: usize = FEATURE_COLUMNS.len();

/// A patient's clinical measurements.
///
/// Five fields are mandatory; the clinical indicators fall back to zero when
/// absent from the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub age: f64,
    #[serde(deserialize_with = "integral")]
    pub sex: i32,
    pub trestbps: f64,
    pub chol: f64,
    pub thalach: f64,

    #[serde(default, deserialize_with = "integral")]
    pub cp: i32,
    #[serde(default, deserialize_with = "integral")]
    pub fbs: i32,
    #[serde(default, deserialize_with = "integral")]
    pub restecg: i32,
    #[serde(default, deserialize_with = "integral")]
    pub exang: i32,
    #[serde(default)]
    pub oldpeak: f64,
    #[serde(default, deserialize_with = "integral")]
    pub slope: i32,
    #[serde(default, deserialize_with = "integral")]
    pub ca: i32,
    #[serde(default, deserialize_with = "integral")]
    pub thal: i32,
}

/// Accept `1` and `1.0` alike for categorical codes; `1.5` is rejected
fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Int(i64),
        Float(f64),
    }

    let value = match Code::deserialize(deserializer)? {
        Code::Int(v) => v as f64,
        Code::Float(v) => v,
    };
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
        Ok(value as i32)
    } else {
        Err(serde::de::Error::custom(format!("expected an integer code, got {}", value)))
    }
}

impl PatientRecord {
    /// Record with only the mandatory fields set
    pub fn new(age: f64, sex: i32, trestbps: f64, chol: f64, thalach: f64) -> Self {
        Self {
            age,
            sex,
            trestbps,
            chol,
            thalach,
            cp: 0,
            fbs: 0,
            restecg: 0,
            exang: 0,
            oldpeak: 0.0,
            slope: 0,
            ca: 0,
            thal: 0,
        }
    }

    /// Reject values the classifier was never trained on
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("age", self.age),
            ("trestbps", self.trestbps),
            ("chol", self.chol),
            ("thalach", self.thalach),
            ("oldpeak", self.oldpeak),
        ] {
            if !value.is_finite() {
                return Err(CardioError::ValidationError(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }

        for (name, value) in [("sex", self.sex), ("fbs", self.fbs), ("exang", self.exang)] {
            if value != 0 && value != 1 {
                return Err(CardioError::ValidationError(format!(
                    "{} must be 0 or 1, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Value of a canonical feature by name
    pub fn get(&self, column: &str) -> Option<f64> {
        let value = match column {
            "age" => self.age,
            "sex" => self.sex as f64,
            "cp" => self.cp as f64,
            "trestbps" => self.trestbps,
            "chol" => self.chol,
            "fbs" => self.fbs as f64,
            "restecg" => self.restecg as f64,
            "thalach" => self.thalach,
            "exang" => self.exang as f64,
            "oldpeak" => self.oldpeak,
            "slope" => self.slope as f64,
            "ca" => self.ca as f64,
            "thal" => self.thal as f64,
            _ => return None,
        };
        Some(value)
    }

    /// Full feature row in canonical column order
    pub fn to_feature_row(&self) -> [f64; N_FEATURES] {
        let mut row = [0.0; N_FEATURES];
        for (slot, column) in row.iter_mut().zip(FEATURE_COLUMNS.iter()) {
            // every canonical column has a field
            *slot = self.get(column).unwrap_or_default();
        }
        row
    }

    /// Single-row matrix ready for `predict_proba`
    pub fn to_array(&self) -> Array2<f64> {
        let row = self.to_feature_row();
        Array2::from_shape_fn((1, N_FEATURES), |(_, j)| row[j])
    }
}
