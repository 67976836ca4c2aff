//! Test Ledger reporter - command line entry point.
//!
//! `testledger-report prepare` runs before the test suite and resets the log
//! directory; `testledger-report complete` (the default) runs afterwards and
//! reports the run.

use std::process::ExitCode;

use chrono::Utc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use testledger_reporter::config::Config;
use testledger_reporter::services::workspace::prepare_output_dir;
use testledger_reporter::services::{PipelineOutcome, complete_run};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let command = std::env::args().nth(1).unwrap_or_else(|| "complete".to_string());

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - TESTLEDGER_OUTPUT_DIR must point at the wdio log directory");
            error!("  - TESTLEDGER_API_TOKEN must be set");
            return ExitCode::FAILURE;
        }
    };

    match command.as_str() {
        "prepare" => prepare(&config).await,
        "complete" => {
            complete(&config).await;
            ExitCode::SUCCESS
        }
        other => {
            error!("Unknown command '{}', expected 'prepare' or 'complete'", other);
            ExitCode::FAILURE
        }
    }
}

async fn prepare(config: &Config) -> ExitCode {
    match prepare_output_dir(&config.output_dir, Utc::now()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to prepare {}: {}", config.output_dir.display(), e);
            ExitCode::FAILURE
        }
    }
}

async fn complete(config: &Config) {
    let outcome = complete_run(config, Utc::now()).await;
    log_outcome(&outcome);
}

fn log_outcome(outcome: &PipelineOutcome) {
    match &outcome.report {
        Some(report) => info!(
            "Reported {} suites ({} tests), run {}",
            report.suites.len(),
            report.test_count(),
            if report.is_failed() { "failed" } else { "passed" }
        ),
        None => warn!("No run report was produced"),
    }

    if let Some(upload) = &outcome.upload {
        info!(
            "Artifacts: {} collected, {} uploaded, {} failed, confirmed={}",
            upload.artifacts,
            upload.transferred(),
            upload.failed(),
            upload.confirmed
        );
    }

    if !outcome.diagnostics.is_empty() {
        warn!("Completed with {} problems:", outcome.diagnostics.len());
        for diagnostic in outcome.diagnostics.entries() {
            warn!("  [{}] {}", diagnostic.stage, diagnostic.message);
        }
    }
}
