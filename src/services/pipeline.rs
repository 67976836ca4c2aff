//! End-of-run pipeline: aggregate, submit, collect, upload.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{RunMetadata, RunReport, RunResult, UploadSummary};
use crate::services::aggregation::LogAggregator;
use crate::services::collector::ArtifactCollector;
use crate::services::diagnostics::{Diagnostics, Stage};
use crate::services::ledger::LedgerClient;
use crate::services::reporter::RunReporter;
use crate::services::uploader::ArtifactUploader;
use crate::services::workspace::read_run_start;

/// Everything one pipeline run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// `None` when aggregation failed
    pub report: Option<RunReport>,
    pub run_result: RunResult,
    /// `None` when the artifact stages did not run
    pub upload: Option<UploadSummary>,
    pub diagnostics: Diagnostics,
}

/// Run metadata for a run that started at `started_at` and ended at `finished_at`.
pub fn run_metadata(
    config: &Config,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> RunMetadata {
    let run_date = started_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let run = &config.run;

    RunMetadata {
        project_id: config.ledger.project_id.clone(),
        uuid: run.run_uuid.clone(),
        group_uuid: run.group_uuid.clone(),
        main_run: run.main_run,
        title: run.title.clone().unwrap_or_else(|| run_date.clone()),
        site: run.site.clone(),
        build_url: run.build_url.clone(),
        duration: (finished_at - started_at).num_milliseconds().max(0),
        run_date,
        version: run.version.clone(),
        suites_ran: run.suites_ran(),
        issue_user: run.issue_user.clone(),
        issue_summary: run.issue_summary.clone(),
        enable_flaky: run.enable_flaky,
    }
}

/// Report a run finishing at `finished_at` whose start was stamped by `prepare`.
///
/// Without a readable start marker the run is dated `finished_at`.
pub async fn complete_run(config: &Config, finished_at: DateTime<Utc>) -> PipelineOutcome {
    let mut diagnostics = Diagnostics::new();
    let started_at = read_run_start(&config.output_dir, &mut diagnostics)
        .await
        .unwrap_or(finished_at);

    run_stages(config, started_at, finished_at, diagnostics).await
}

/// Run every stage once. Never fails; problems end up in the outcome's diagnostics.
pub async fn run_pipeline(
    config: &Config,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> PipelineOutcome {
    run_stages(config, started_at, finished_at, Diagnostics::new()).await
}

/// Run ids are sent verbatim; ones that are not UUIDs are only flagged.
fn check_run_ids(config: &Config, diagnostics: &mut Diagnostics) {
    for (name, value) in [
        ("RUN_UUID", &config.run.run_uuid),
        ("GROUP_UUID", &config.run.group_uuid),
    ] {
        if let Some(value) = value
            && Uuid::parse_str(value).is_err()
        {
            diagnostics.record(
                Stage::Prepare,
                format!("{} is not a UUID, sending it unchanged: {}", name, value),
            );
        }
    }
}

async fn run_stages(
    config: &Config,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    diagnostics: Diagnostics,
) -> PipelineOutcome {
    let mut outcome = PipelineOutcome {
        report: None,
        run_result: RunResult::empty(),
        upload: None,
        diagnostics,
    };

    check_run_ids(config, &mut outcome.diagnostics);

    let metadata = run_metadata(config, started_at, finished_at);
    let report = match LogAggregator::from_config(config).aggregate(
        &config.output_dir,
        metadata,
        &mut outcome.diagnostics,
    ) {
        Ok(report) => report,
        Err(e) => {
            outcome
                .diagnostics
                .record(Stage::Aggregation, format!("Failed to aggregate logs: {}", e));
            return outcome;
        }
    };

    let ledger = match LedgerClient::new(&config.ledger) {
        Ok(ledger) => ledger,
        Err(e) => {
            outcome.diagnostics.record(Stage::Submission, e.to_string());
            outcome.report = Some(report);
            return outcome;
        }
    };

    outcome.run_result = RunReporter::new(ledger.clone())
        .submit(&report, &mut outcome.diagnostics)
        .await;

    if config.artifacts.enabled {
        if outcome.run_result.is_accepted() {
            let artifacts = ArtifactCollector::new().collect(
                &report,
                &outcome.run_result,
                config.artifacts.screenshot_dir.as_deref(),
                config.artifacts.video_dir.as_deref(),
                &mut outcome.diagnostics,
            );
            let summary = ArtifactUploader::new(ledger, config.artifacts.max_concurrent_transfers)
                .upload(&artifacts, &mut outcome.diagnostics)
                .await;
            outcome.upload = Some(summary);
        } else {
            warn!("Skipping artifact upload: run was not accepted by the ledger");
        }
    }

    info!(
        "Pipeline finished with {} diagnostics",
        outcome.diagnostics.len()
    );
    outcome.report = Some(report);
    outcome
}
