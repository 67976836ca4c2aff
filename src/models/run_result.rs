//! Identifiers the ledger assigns to a submitted run.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use super::LedgerId;
use super::composite_key::ledger_suite_key;
use super::run_report::SuiteRecord;

/// Status value the ledger returns for an accepted run.
pub const ACCEPTED_STATUS: &str = "success";

/// Suite entry of the `POST /runs` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSuite {
    pub id: LedgerId,
    #[serde(default)]
    pub suite_key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub spec_file: Option<String>,
    /// Echoed capabilities; non-strings become their compact JSON text
    #[serde(default, deserialize_with = "lenient_capabilities")]
    pub capabilities: Option<String>,
}

/// Same normalization the log records apply, so recomputed keys line up.
fn lenient_capabilities<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

impl LedgerSuite {
    /// Lookup key, recomputed from the entry's own fields when the ledger sends them.
    pub fn lookup_key(&self) -> Option<String> {
        match (&self.title, &self.spec_file, &self.capabilities) {
            (Some(title), Some(spec_file), Some(capabilities)) => {
                Some(ledger_suite_key(title, spec_file, capabilities))
            }
            _ => self.suite_key.clone(),
        }
    }
}

/// Test entry of the `POST /runs` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerTest {
    pub id: LedgerId,
    #[serde(default)]
    pub suite_test_key: Option<String>,
    #[serde(default)]
    pub test_run_suite_id: Option<LedgerId>,
}

/// Raw `POST /runs` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub suites: Vec<LedgerSuite>,
    #[serde(default)]
    pub tests: Vec<LedgerTest>,
}

/// Server-assigned suite and test identifiers for one run.
///
/// The default value is the empty result used when submission failed; it
/// associates nothing. Artifacts are associated per suite only; the test
/// table is kept so a test-level [`SuiteMatcher`] can look ids up.
///
/// [`SuiteMatcher`]: crate::services::collector::SuiteMatcher
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RunResponse")]
pub struct RunResult {
    status: Option<String>,
    suite_ids: HashMap<String, LedgerId>,
    tests: HashMap<String, LedgerTest>,
}

impl From<RunResponse> for RunResult {
    fn from(response: RunResponse) -> Self {
        let suite_ids = response
            .suites
            .into_iter()
            .filter_map(|suite| suite.lookup_key().map(|key| (key, suite.id)))
            .collect();

        let tests = response
            .tests
            .into_iter()
            .filter_map(|test| test.suite_test_key.clone().map(|key| (key, test)))
            .collect();

        RunResult {
            status: response.status,
            suite_ids,
            tests,
        }
    }
}

impl RunResult {
    /// Result used when the run could not be submitted.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the ledger accepted the run.
    pub fn is_accepted(&self) -> bool {
        self.status.as_deref() == Some(ACCEPTED_STATUS)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Ledger id of a submitted suite.
    pub fn suite_id(&self, suite: &SuiteRecord) -> Option<&LedgerId> {
        self.suite_ids.get(&suite.ledger_key())
    }

    /// Ledger entry of a test by its suite/test key. Unused by the default
    /// suite-level matching.
    pub fn test(&self, suite_test_key: &str) -> Option<&LedgerTest> {
        self.tests.get(suite_test_key)
    }

    pub fn suite_count(&self) -> usize {
        self.suite_ids.len()
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }
}
