//! Prediction service
//!
//! Serves the best tracked model over HTTP: `POST /predict` and `GET /health`.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::PredictResponse;
pub use state::{InferenceLogger, ServiceContext};

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::tracking::TrackingConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Append every prediction to the experiment's inference log
    pub log_inference: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            log_inference: std::env::var("LOG_INFERENCE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Load the best model and serve it until ctrl+c
pub async fn run_server(config: ServerConfig, tracking: TrackingConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        tracking_uri = %tracking.tracking_uri,
        experiment = %tracking.experiment_name,
        "Loading best model"
    );

    let loader_config = config.clone();
    let loader_tracking = tracking.clone();
    let ctx = tokio::task::spawn_blocking(move || ServiceContext::load(&loader_tracking, loader_config))
        .await??;

    info!(
        run_id = %ctx.run_id,
        run_name = %ctx.run_name,
        model = %ctx.pipeline.model_type(),
        log_inference = config.log_inference,
        "Model ready"
    );

    let app = create_router(Arc::new(ctx));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");
    info!(url = %format!("http://{}/health", addr), "Health endpoint available");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c, serving until killed");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
