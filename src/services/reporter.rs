//! Run report submission.

use tracing::info;

use crate::models::{RunReport, RunResult};
use crate::services::diagnostics::{Diagnostics, Stage};
use crate::services::ledger::LedgerClient;

/// Submits aggregated reports to the ledger.
#[derive(Debug, Clone)]
pub struct RunReporter {
    ledger: LedgerClient,
}

impl RunReporter {
    pub fn new(ledger: LedgerClient) -> Self {
        RunReporter { ledger }
    }

    /// Submit `report` once.
    ///
    /// Never fails: transport errors, non-success statuses and undecodable
    /// responses are recorded in `diagnostics` and yield [`RunResult::empty`],
    /// which associates no artifacts.
    pub async fn submit(&self, report: &RunReport, diagnostics: &mut Diagnostics) -> RunResult {
        info!(
            "Submitting run report to {}: {} suites, {} tests, failed={}",
            self.ledger.api_url(),
            report.suites.len(),
            report.test_count(),
            report.is_failed()
        );

        match self.ledger.submit_run(report).await {
            Ok(result) if result.is_accepted() => {
                info!(
                    "Run accepted: {} suites and {} tests registered",
                    result.suite_count(),
                    result.test_count()
                );
                result
            }
            Ok(result) => {
                diagnostics.record(
                    Stage::Submission,
                    format!(
                        "Ledger did not accept the run (status: {})",
                        result.status().unwrap_or("missing")
                    ),
                );
                result
            }
            Err(e) => {
                diagnostics.record(
                    Stage::Submission,
                    format!("Failed to submit run report: {}", e),
                );
                RunResult::empty()
            }
        }
    }
}
