//! HTTP request handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::features::PatientRecord;
use crate::tracking::InferenceRecord;

use super::error::{Result, ServerError};
use super::state::ServiceContext;

/// Body of a successful `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: i32,
    pub confidence: f64,
}

impl PredictResponse {
    /// Round `probability` to 4 decimals and threshold the rounded value.
    ///
    /// Probabilities in `[0.49995, 0.5)` are labelled 1, so the label always
    /// agrees with the reported confidence.
    pub fn from_probability(probability: f64) -> Self {
        let confidence = (probability * 10_000.0).round() / 10_000.0;
        Self {
            prediction: if confidence >= 0.5 { 1 } else { 0 },
            confidence,
        }
    }
}

/// Predict heart-disease risk for one patient
pub async fn predict(
    State(ctx): State<Arc<ServiceContext>>,
    Json(record): Json<PatientRecord>,
) -> Result<Json<PredictResponse>> {
    record.validate()?;

    let probability = ctx.pipeline.predict_record(&record)?;
    if !probability.is_finite() {
        return Err(ServerError::Inference(format!(
            "model returned a non-finite probability ({})",
            probability
        )));
    }

    let response = PredictResponse::from_probability(probability);
    debug!(
        run_id = %ctx.run_id,
        prediction = response.prediction,
        confidence = response.confidence,
        "Prediction served"
    );

    if let Some(logger) = ctx.inference_logger.clone() {
        let record = InferenceRecord {
            timestamp: chrono::Utc::now(),
            endpoint: "/predict".to_string(),
            run_id: ctx.run_id.clone(),
            prediction: response.prediction,
            confidence: response.confidence,
        };
        // fire and forget; the response does not wait for the write
        tokio::task::spawn_blocking(move || {
            if let Err(e) = logger.log(&record) {
                warn!(error = %e, "Failed to write inference log");
            }
        });
    }

    Ok(Json(response))
}

/// Liveness probe
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_rounded() {
        let r = PredictResponse::from_probability(0.123456);
        assert_eq!(r.confidence, 0.1235);
        assert_eq!(r.prediction, 0);
    }

    #[test]
    fn test_threshold_applies_to_rounded_value() {
        let r = PredictResponse::from_probability(0.49996);
        assert_eq!(r.confidence, 0.5);
        assert_eq!(r.prediction, 1);

        let r = PredictResponse::from_probability(0.49994);
        assert_eq!(r.confidence, 0.4999);
        assert_eq!(r.prediction, 0);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(PredictResponse::from_probability(0.0), PredictResponse { prediction: 0, confidence: 0.0 });
        assert_eq!(PredictResponse::from_probability(1.0), PredictResponse { prediction: 1, confidence: 1.0 });
    }
}
