//! Composite keys correlating occurrences across log files.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Deterministic encoding of `(identifier, spec_file, capabilities, title[, test_title])`.
///
/// Each segment is base64-encoded before joining with `:`. The base64 alphabet
/// has no `:`, so two keys are equal iff every segment is equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey(String);

impl CompositeKey {
    /// Key of a suite within one worker/run identifier.
    pub fn suite(identifier: &str, spec_file: &str, capabilities: &str, title: &str) -> Self {
        Self::encode(&[identifier, spec_file, capabilities, title])
    }

    /// Key of a test within a suite.
    pub fn test(
        identifier: &str,
        spec_file: &str,
        capabilities: &str,
        title: &str,
        test_title: &str,
    ) -> Self {
        Self::encode(&[identifier, spec_file, capabilities, title, test_title])
    }

    fn encode(segments: &[&str]) -> Self {
        let encoded: Vec<String> = segments.iter().map(|s| STANDARD.encode(s)).collect();
        Self(encoded.join(":"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key the ledger files a submitted suite under: `<title>:<spec_file>:<capabilities>`.
pub fn ledger_suite_key(title: &str, spec_file: &str, capabilities: &str) -> String {
    format!("{}:{}:{}", title, spec_file, capabilities)
}
