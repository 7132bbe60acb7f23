//! geririsk: vital-sign risk scoring
//!
//! Reads one JSON feature mapping from stdin and writes the combined
//! cardiac/fall/respiratory result to stdout.

use std::io::Read;
use std::process::ExitCode;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use geririsk::config::{AppConfig, LogMode};
use geririsk::GeririskError;

fn init_logging(config: &AppConfig) -> anyhow::Result<WorkerGuard> {
    // Stdout carries the response, so logs never go there.
    let (writer, guard) = match config.log_mode {
        LogMode::File => {
            if let Some(parent) = config.log_file.parent() {
                // Best-effort: a missing directory surfaces on open below.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)
                .with_context(|| format!("opening log file {:?}", config.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    Ok(guard)
}

fn run(config: &AppConfig) -> Result<String, GeririskError> {
    // Artifacts load before any input is read.
    let pipeline = geririsk::build_pipeline(config)?;

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;

    geririsk::predict_json(&pipeline, &input)
}

fn main() -> ExitCode {
    let config = AppConfig::from_env_or_default();

    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("geririsk: failed to initialize logging: {e:#}");
            return ExitCode::from(1);
        }
    };

    tracing::info!("Starting geririsk (model dir {:?})", config.model_dir);

    match run(&config) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!("Rejected request: {}", e);
            } else {
                tracing::error!("Request failed: {}", e);
            }
            eprintln!("geririsk: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
