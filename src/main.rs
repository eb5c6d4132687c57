//! Cardio - Main Entry Point
//!
//! Data preparation, tracked training, model serving and an interactive
//! client behind one binary.

use clap::Parser;
use cardio_mlops::cli::{Cli, Commands, cmd_prepare, cmd_train, cmd_serve, cmd_predict, cmd_runs, cmd_interactive};
use cardio_mlops::server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardio_mlops=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Prepare { source, output, plots, no_plots }) => {
            let plots = if no_plots { None } else { Some(&plots) };
            cmd_prepare(&source, &output, plots).await?;
        }
        Some(Commands::Train { data, seed, test_size, tracking }) => {
            cmd_train(&data, seed, test_size, &tracking.resolve())?;
        }
        Some(Commands::Serve { host, port, log_inference, tracking }) => {
            let mut config = ServerConfig::default();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.log_inference |= log_inference;
            cmd_serve(config, tracking.resolve()).await?;
        }
        Some(Commands::Predict { api_url }) => {
            cmd_predict(&api_url).await?;
        }
        Some(Commands::Runs { tracking }) => {
            cmd_runs(&tracking.resolve())?;
        }
        None => {
            cmd_interactive().await?;
        }
    }

    Ok(())
}
