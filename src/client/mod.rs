//! Terminal client for the prediction service
//!
//! Collects the five mandatory measurements with dialoguer prompts and posts
//! them to a running server.

use std::time::Duration;

use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use tracing::debug;

use crate::error::{CardioError, Result};
use crate::features::PatientRecord;
use crate::server::PredictResponse;

/// Default address of a locally running server
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// HTTP client for `POST /predict` and `GET /health`
#[derive(Debug, Clone)]
pub struct PredictionClient {
    api_url: String,
    http: reqwest::Client,
}

impl PredictionClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        if api_url.is_empty() {
            return Err(CardioError::ConfigError("api url must not be empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { api_url, http })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Ask the server for a prediction.
    ///
    /// Non-success statuses become [`CardioError::HttpError`] carrying the
    /// status code and the server's `message` when the body has one.
    pub async fn predict(&self, record: &PatientRecord) -> Result<PredictResponse> {
        let url = format!("{}/predict", self.api_url);
        debug!(url = %url, "Sending prediction request");

        let response = self.http.post(&url).json(record).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CardioError::HttpError(format!(
                "{}: {}",
                status,
                error_message(&body)
            )));
        }

        Ok(response.json::<PredictResponse>().await?)
    }

    /// `true` when `/health` answers `{"status": "ok"}`
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.api_url);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        Ok(body.get("status").and_then(|s| s.as_str()) == Some("ok"))
    }
}

/// Pull `message` out of a JSON error body, or fall back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Human label for a prediction
pub fn risk_label(prediction: i32) -> &'static str {
    if prediction == 1 {
        "Heart disease likely"
    } else {
        "No heart disease detected"
    }
}

fn prompt_number(theme: &ColorfulTheme, prompt: &str, min: f64, max: f64, default: f64) -> Result<f64> {
    Input::<f64>::with_theme(theme)
        .with_prompt(format!("{} ({}-{})", prompt, min, max))
        .default(default)
        .validate_with(move |v: &f64| -> std::result::Result<(), String> {
            if *v >= min && *v <= max {
                Ok(())
            } else {
                Err(format!("must be between {} and {}", min, max))
            }
        })
        .interact_text()
        .map_err(|e| CardioError::IoError(std::io::Error::other(e.to_string())))
}

/// Prompt for a patient's measurements
pub fn prompt_record(theme: &ColorfulTheme) -> Result<PatientRecord> {
    let age = prompt_number(theme, "Age", 1.0, 120.0, 45.0)?;

    let sex = Select::with_theme(theme)
        .with_prompt("Sex")
        .items(&["Female (0)", "Male (1)"])
        .default(0)
        .interact()
        .map_err(|e| CardioError::IoError(std::io::Error::other(e.to_string())))?;

    let trestbps = prompt_number(theme, "Resting blood pressure", 80.0, 200.0, 120.0)?;
    let chol = prompt_number(theme, "Cholesterol", 100.0, 600.0, 200.0)?;
    let thalach = prompt_number(theme, "Max heart rate", 60.0, 220.0, 150.0)?;

    Ok(PatientRecord::new(age, sex as i32, trestbps, chol, thalach))
}

/// Collect one record, send it and print the outcome
pub async fn run_interactive(api_url: &str) -> Result<()> {
    let client = PredictionClient::new(api_url)?;
    let theme = ColorfulTheme::default();

    println!();
    println!("  {}", "Heart Disease Risk".white().bold());
    println!("  {}", format!("server {}", client.api_url()).truecolor(100, 100, 100));
    println!();

    let record = prompt_record(&theme)?;

    match client.predict(&record).await {
        Ok(result) => {
            let label = risk_label(result.prediction);
            let label = if result.prediction == 1 { label.red().bold() } else { label.green().bold() };
            println!();
            println!("  {}", label);
            println!("  {:<12} {:.4}", "confidence".truecolor(100, 100, 100), result.confidence);
            println!();
        }
        Err(e) => {
            println!();
            println!("  {} {}", "error".red(), e);
            println!();
        }
    }

    Ok(())
}
