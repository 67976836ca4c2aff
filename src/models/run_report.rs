//! Aggregated run report submitted to the ledger.

use serde::Serialize;
use serde_json::{Number, Value as JsonValue};

use super::LedgerId;
use super::composite_key::ledger_suite_key;

/// Run-level metadata supplied by the environment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetadata {
    pub project_id: Option<LedgerId>,
    /// Run identifier, normally a UUID
    pub uuid: Option<String>,
    /// Groups sharded runs together
    pub group_uuid: Option<String>,
    pub main_run: Option<i64>,
    pub title: String,
    /// Site the tests ran against
    pub site: Option<String>,
    pub build_url: Option<String>,
    /// RFC 3339 start timestamp
    pub run_date: String,
    /// Wall-clock duration in milliseconds
    pub duration: i64,
    pub version: String,
    pub suites_ran: String,
    pub issue_user: Option<String>,
    pub issue_summary: Option<String>,
    pub enable_flaky: i64,
}

/// Aggregated result of one test inside a suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Number>,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    pub failed: bool,
    pub skipped: bool,
    /// Errors of every occurrence of this test seen so far
    pub errors: Vec<String>,
}

/// Aggregated result of one spec file for one capability set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteRecord {
    pub title: String,
    pub spec_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    pub capabilities: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Number>,
    pub retries: u32,
    pub passed: bool,
    pub failed: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<JsonValue>,
    pub tests: Vec<TestRecord>,
}

impl SuiteRecord {
    /// Key the ledger uses for this suite in its run response.
    pub fn ledger_key(&self) -> String {
        ledger_suite_key(&self.title, &self.spec_file, &self.capabilities)
    }
}

/// The report submitted once per run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub metadata: RunMetadata,
    pub passed: u8,
    pub failed: u8,
    pub suites: Vec<SuiteRecord>,
}

impl RunReport {
    /// Build a report; the run fails iff any suite failed.
    pub fn new(metadata: RunMetadata, suites: Vec<SuiteRecord>) -> Self {
        let any_failed = suites.iter().any(|suite| suite.failed);
        RunReport {
            metadata,
            passed: u8::from(!any_failed),
            failed: u8::from(any_failed),
            suites,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed == 1
    }

    pub fn test_count(&self) -> usize {
        self.suites.iter().map(|suite| suite.tests.len()).sum()
    }
}
