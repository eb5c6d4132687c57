//! Cardio CLI Module
//!
//! Command-line interface for preparing data, training tracked runs, serving
//! the best model and querying it.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::client::{self, DEFAULT_API_URL};
use crate::data::{self, RawSource, DEFAULT_DATASET_PATH};
use crate::registry::{select_best, SELECTION_METRIC};
use crate::server::ServerConfig;
use crate::tracking::{ExperimentTracker, RunStatus, TrackingConfig};
use crate::training::{TrainingConfig, TrainingPipeline};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn wait_enter() {
    println!();
    println!("  {}", dim("press enter to continue"));
    let mut input = String::new();
    let _ = std::io::stdin().read_line(&mut input);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cardio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart-disease risk classifier with tracked training runs and a prediction API")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Tracking store flags shared by `train`, `serve` and `runs`.
/// Unset flags fall back to `TRACKING_URI` / `EXPERIMENT_NAME`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TrackingArgs {
    /// Tracking store location (directory, `file:` or `file://`)
    #[arg(long)]
    pub tracking_uri: Option<String>,

    /// Experiment name
    #[arg(long)]
    pub experiment: Option<String>,
}

impl TrackingArgs {
    pub fn resolve(&self) -> TrackingConfig {
        let mut config = TrackingConfig::default();
        if let Some(uri) = &self.tracking_uri {
            config.tracking_uri = uri.clone();
        }
        if let Some(name) = &self.experiment {
            config.experiment_name = name.clone();
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, clean and save the heart-disease dataset
    Prepare {
        /// Raw data URL or local file
        #[arg(short, long, default_value = data::UCI_CLEVELAND_URL)]
        source: String,

        /// Output CSV file
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        output: PathBuf,

        /// Directory for the exploratory plots
        #[arg(long, default_value = "artifacts/plots")]
        plots: PathBuf,

        /// Skip plot rendering
        #[arg(long)]
        no_plots: bool,
    },

    /// Train every model family and record one run each
    Train {
        /// Prepared dataset
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        data: PathBuf,

        /// Random seed for the split and the forest
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        #[command(flatten)]
        tracking: TrackingArgs,
    },

    /// Serve the best tracked model
    Serve {
        /// Server host (default: API_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Server port (default: API_PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Record every prediction in the experiment's inference log
        #[arg(long)]
        log_inference: bool,

        #[command(flatten)]
        tracking: TrackingArgs,
    },

    /// Query a running server interactively
    Predict {
        /// Server base URL
        #[arg(long, default_value = DEFAULT_API_URL)]
        api_url: String,
    },

    /// List the runs of an experiment
    Runs {
        #[command(flatten)]
        tracking: TrackingArgs,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_prepare(source: &str, output: &PathBuf, plots: Option<&PathBuf>) -> anyhow::Result<()> {
    section("Prepare");

    let source = RawSource::parse(source);
    step_run(&format!("Fetching {}", source));
    let start = Instant::now();
    let summary = data::prepare_dataset(&source, output).await?;
    step_done(&format!("{:?}", start.elapsed()));

    step_ok(&format!(
        "{} rows kept, {} dropped with missing values",
        summary.rows, summary.dropped_rows
    ));
    step_ok(&format!("{} positive / {} negative", summary.positives, summary.rows - summary.positives));
    step_ok(&format!("saved {}", summary.output.display()));

    if let Some(dir) = plots {
        step_run(&format!("Rendering plots → {}", dir.display()));
        let df = data::load_dataset(output)?;
        let paths = data::render_plots(&df, dir)?;
        step_done(&format!("{}", paths.correlation.display()));
    }

    println!();
    Ok(())
}

pub fn cmd_train(data_path: &PathBuf, seed: u64, test_size: f64, tracking: &TrackingConfig) -> anyhow::Result<()> {
    section("Train");

    let tracker = ExperimentTracker::from_config(tracking)?;
    let config = TrainingConfig::default()
        .with_random_state(seed)
        .with_test_size(test_size);

    println!("  {:<16} {}", muted("Tracking"), tracker.location());
    println!("  {:<16} {}", muted("Experiment"), tracking.experiment_name);
    println!();

    step_run(&format!("Training {} model families", config.models.len()));
    let start = Instant::now();
    let report = TrainingPipeline::new(config, tracker)
        .with_experiment_name(tracking.experiment_name.clone())
        .run(data_path)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!(
        "  {:<24} {:>8} {:>8} {:>8} {:>8}",
        muted("Model"), muted("Acc"), muted("F1"), muted("AUC"), muted("Time")
    );
    println!("  {}", dim(&"─".repeat(60)));

    for run in &report.runs {
        match &run.metrics {
            Some(m) => println!(
                "  {:<24} {:>8.4} {:>8.4} {:>8.4} {:>7.2}s",
                run.model_type.to_string(), m.accuracy, m.f1_score, m.roc_auc, run.training_time_secs
            ),
            None => println!(
                "  {:<24} {}",
                run.model_type.to_string(),
                format!("failed: {}", run.error.as_deref().unwrap_or("unknown error")).red()
            ),
        }
    }

    println!("  {}", dim(&"─".repeat(60)));
    println!("  {:<16} {} train / {} test", muted("Rows"), report.n_train, report.n_test);

    if let Some(best) = report.best() {
        let auc = best.metrics.as_ref().map(|m| m.roc_auc).unwrap_or(f64::NAN);
        println!();
        println!(
            "  {} {} {} {:.4}",
            ok("best"),
            best.model_type.to_string().white().bold(),
            muted("roc_auc:"),
            auc
        );
    }

    println!();
    Ok(())
}

pub fn cmd_runs(tracking: &TrackingConfig) -> anyhow::Result<()> {
    section("Runs");

    let tracker = ExperimentTracker::from_config(tracking)?;
    let Some(experiment) = tracker.get_experiment_by_name(&tracking.experiment_name)? else {
        println!("  {}", format!("experiment '{}' not found", tracking.experiment_name).yellow());
        println!();
        return Ok(());
    };

    let runs = tracker.search_runs(&experiment.experiment_id)?;
    let selected = select_best(&runs).ok().map(|r| r.run_id.clone());

    println!("  {:<12} {} ({})", muted("Experiment"), experiment.name, experiment.experiment_id);
    println!("  {:<12} {}", muted("Runs"), runs.len());
    println!();
    println!(
        "  {:<2} {:<34} {:<20} {:<9} {:>8} {:>8}",
        "", muted("Run"), muted("Name"), muted("Status"), muted("Acc"), muted("AUC")
    );
    println!("  {}", dim(&"─".repeat(86)));

    for run in &runs {
        let marker = if selected.as_deref() == Some(run.run_id.as_str()) { ok("★") } else { " ".normal() };
        let status = match run.status {
            RunStatus::Finished => "FINISHED".green(),
            RunStatus::Failed => "FAILED".red(),
            RunStatus::Running => "RUNNING".yellow(),
        };
        let fmt_metric = |name: &str| {
            run.metric(name)
                .map(|v| format!("{:.4}", v))
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "  {:<2} {:<34} {:<20} {:<9} {:>8} {:>8}",
            marker,
            run.run_id,
            run.run_name,
            status,
            fmt_metric("accuracy"),
            fmt_metric(SELECTION_METRIC)
        );
    }

    if selected.is_none() && !runs.is_empty() {
        println!();
        println!("  {}", "no finished run has a roc_auc metric".yellow());
    }

    println!();
    Ok(())
}

pub async fn cmd_predict(api_url: &str) -> anyhow::Result<()> {
    client::run_interactive(api_url).await?;
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(config: ServerConfig, tracking: TrackingConfig) -> anyhow::Result<()> {
    use crate::server::run_server;

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Cardio Prediction API".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Predict   ", &format!("POST http://{}:{}/predict", config.host, config.port)));
    line_box(&kv("Health    ", &format!("GET  http://{}:{}/health", config.host, config.port)));
    line_box(&kv("Experiment", &tracking.experiment_name));
    line_box(&kv("Inference ", if config.log_inference { "logged" } else { "not logged" }));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config, tracking).await
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!();
    println!("       {}", "┏━╸┏━┓┏━┓╺┳┓╻┏━┓".truecolor(255, 130, 130));
    println!("       {}", "┃  ┣━┫┣┳┛ ┃┃┃┃ ┃".truecolor(240, 110, 110));
    println!("       {}", "┗━╸╹ ╹╹┗╸╺┻┛╹┗━┛".truecolor(220, 90, 90));
    println!();
    println!("       {}", dim(&format!("heart-disease risk  ·  v{}  ·  rust", env!("CARGO_PKG_VERSION"))));
    println!();
}

fn show_help() {
    section("Commands");

    let cmds: &[(&str, &str)] = &[
        ("cardio", "Interactive launcher (default)"),
        ("cardio prepare", "Fetch and clean the UCI dataset"),
        ("cardio train", "Train and track every model family"),
        ("cardio runs", "List runs and the selected model"),
        ("cardio serve -p 8000", "Serve the best model"),
        ("cardio predict", "Query a running server"),
    ];

    for (cmd, desc) in cmds {
        println!("  {:<44} {}", cmd.white(), muted(desc));
    }

    section("Environment");

    let vars: &[(&str, &str)] = &[
        ("TRACKING_URI", "Tracking store (./mlruns)"),
        ("EXPERIMENT_NAME", "Experiment (Heart Disease Prediction)"),
        ("API_HOST / API_PORT", "Server address (0.0.0.0:8000)"),
        ("LOG_INFERENCE", "Record predictions (false)"),
    ];

    for (var, desc) in vars {
        println!("  {:<44} {}", var.truecolor(120, 170, 255), muted(desc));
    }

    println!();
}

pub async fn cmd_interactive() -> anyhow::Result<()> {
    use dialoguer::{Select, theme::ColorfulTheme};

    print_banner();

    let theme = ColorfulTheme {
        active_item_prefix: dialoguer::console::style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        inactive_item_prefix: dialoguer::console::style("   ".to_string()).for_stderr(),
        inactive_item_style: dialoguer::console::Style::new().for_stderr().color256(245),
        prompt_prefix: dialoguer::console::style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        ..ColorfulTheme::default()
    };

    loop {
        let items = &[
            "Prepare Data          fetch and clean the uci dataset",
            "Train Models          logistic regression + random forest",
            "List Runs             tracked runs and their metrics",
            "Start Server          prediction api on :8000",
            "Predict               query a running server",
            "Help                  commands & environment",
            "Exit",
        ];

        println!();
        let sel = Select::with_theme(&theme)
            .with_prompt("What would you like to do")
            .items(items)
            .default(0)
            .interact_opt()?;

        let tracking = TrackingConfig::default();
        let outcome = match sel {
            Some(0) => {
                let plots = PathBuf::from("artifacts/plots");
                cmd_prepare(data::UCI_CLEVELAND_URL, &PathBuf::from(DEFAULT_DATASET_PATH), Some(&plots)).await
            }
            Some(1) => cmd_train(&PathBuf::from(DEFAULT_DATASET_PATH), 42, 0.2, &tracking),
            Some(2) => cmd_runs(&tracking),
            Some(3) => {
                cmd_serve(ServerConfig::default(), tracking).await?;
                break;
            }
            Some(4) => cmd_predict(DEFAULT_API_URL).await,
            Some(5) => {
                show_help();
                Ok(())
            }
            Some(6) | None => {
                println!();
                println!("  {}", dim("goodbye"));
                println!();
                break;
            }
            _ => Ok(()),
        };

        if let Err(e) = outcome {
            println!();
            println!("  {} {}", "error".red(), e);
        }
        wait_enter();
    }

    Ok(())
}
