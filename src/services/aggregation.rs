//! Log aggregation service.
//!
//! Folds the per-worker log files of one run into a single [`RunReport`].
//!
//! Merge rules:
//! - Occurrences are correlated only by [`CompositeKey`]; a differing
//!   identifier, spec file, capability set or title never merges.
//! - Each test key owns an error accumulator. Every emitted [`TestRecord`]
//!   carries a snapshot of its accumulator at the time it was emitted, so a
//!   retried test repeats the errors of its earlier attempts.
//! - Hooks are buffered per suite and appended after all regular tests.
//! - Log files sharing a suite key fold into one suite; the latest file sets
//!   the suite-level verdict.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::config::{Config, FilenamePolicy};
use crate::error::{AppError, AppResult};
use crate::models::{CompositeKey, LogRecord, RunMetadata, RunReport, SuiteRecord, TestRecord};
use crate::services::diagnostics::{Diagnostics, Stage};

/// Substring identifying candidate log files in the output directory.
const LOG_FILE_MARKER: &str = ".log";

/// `wdio-<worker>-<run>-...`; the capture is the `<worker>-<run>` identifier.
static LOG_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"wdio-(\d+-\d+)-").expect("log filename pattern is valid"));

/// Extract the worker/run identifier from a log filename.
pub fn log_identifier(filename: &str) -> Option<&str> {
    LOG_FILENAME
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Builds run reports from a directory of worker logs.
#[derive(Debug, Clone, Default)]
pub struct LogAggregator {
    skip_passed: bool,
    filename_policy: FilenamePolicy,
}

impl LogAggregator {
    pub fn new(skip_passed: bool, filename_policy: FilenamePolicy) -> Self {
        LogAggregator {
            skip_passed,
            filename_policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.skip_passed, config.filename_policy)
    }

    /// Aggregate every log file in `directory`.
    ///
    /// Fails only when the directory cannot be listed or, under
    /// [`FilenamePolicy::Strict`], when a log file is badly named. Unreadable
    /// or malformed files are skipped and recorded in `diagnostics`.
    pub fn aggregate(
        &self,
        directory: &Path,
        metadata: RunMetadata,
        diagnostics: &mut Diagnostics,
    ) -> AppResult<RunReport> {
        let files = list_log_files(directory)?;
        info!(
            "Aggregating {} log files from {}",
            files.len(),
            directory.display()
        );

        let mut state = AggregationState::default();
        let mut skipped_passed = 0;

        for (filename, path) in files {
            let identifier = match log_identifier(&filename) {
                Some(identifier) => identifier.to_string(),
                None => match self.filename_policy {
                    FilenamePolicy::Strict => return Err(AppError::InvalidLogFilename(filename)),
                    FilenamePolicy::Lenient => {
                        diagnostics.record(
                            Stage::Aggregation,
                            format!("Skipping log file with unexpected name: {}", filename),
                        );
                        continue;
                    }
                },
            };

            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    diagnostics.record(
                        Stage::Aggregation,
                        format!("Failed to read {}: {}", filename, e),
                    );
                    continue;
                }
            };

            let record = match LogRecord::parse(&content) {
                Ok(record) => record,
                Err(e) => {
                    diagnostics.record(
                        Stage::Aggregation,
                        format!("Skipping {}: {}", filename, e),
                    );
                    continue;
                }
            };

            if self.skip_passed && record.passed {
                debug!("Skipping passed suite '{}' from {}", record.title, filename);
                skipped_passed += 1;
                continue;
            }

            state.fold(&identifier, record);
        }

        let suites = state.finish();
        let report = RunReport::new(metadata, suites);

        info!(
            "Aggregation complete: {} suites, {} tests, {} passed suites skipped, failed={}",
            report.suites.len(),
            report.test_count(),
            skipped_passed,
            report.is_failed()
        );

        Ok(report)
    }
}

/// Candidate log files, sorted by filename.
fn list_log_files(directory: &Path) -> AppResult<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(directory).map_err(|e| {
        AppError::FileSystem(format!(
            "Failed to read log directory {}: {}",
            directory.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AppError::FileSystem(format!(
                "Failed to list log directory {}: {}",
                directory.display(),
                e
            ))
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && name.contains(LOG_FILE_MARKER)
        {
            files.push((name.to_string(), path));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Accumulation tables scoped to a single `aggregate` call.
#[derive(Default)]
struct AggregationState {
    /// Suite keys in first-encounter order
    order: Vec<CompositeKey>,
    /// Suites holding their regular (non-hook) tests
    suites: HashMap<CompositeKey, SuiteRecord>,
    /// Running error list per test key
    errors: HashMap<CompositeKey, Vec<String>>,
    /// Hook records per suite key
    hooks: HashMap<CompositeKey, Vec<TestRecord>>,
}

impl AggregationState {
    fn fold(&mut self, identifier: &str, record: LogRecord) {
        let LogRecord {
            spec_file,
            filepath,
            capabilities,
            title,
            duration,
            start,
            retries,
            passed,
            failed,
            skipped,
            tests,
        } = record;

        let suite_key = CompositeKey::suite(identifier, &spec_file, &capabilities, &title);

        let suite = match self.suites.entry(suite_key.clone()) {
            Entry::Occupied(entry) => {
                let suite = entry.into_mut();
                suite.filepath = filepath.or(suite.filepath.take());
                suite.duration = duration;
                suite.retries = retries.unwrap_or(0);
                suite.passed = passed;
                suite.failed = failed;
                suite.skipped = skipped;
                suite.start = start;
                suite
            }
            Entry::Vacant(entry) => {
                self.order.push(suite_key.clone());
                entry.insert(SuiteRecord {
                    title: title.clone(),
                    spec_file: spec_file.clone(),
                    filepath,
                    capabilities: capabilities.clone(),
                    duration,
                    retries: retries.unwrap_or(0),
                    passed,
                    failed,
                    skipped,
                    start,
                    tests: Vec::new(),
                })
            }
        };

        for occurrence in tests {
            let test_key = CompositeKey::test(
                identifier,
                &spec_file,
                &capabilities,
                &title,
                &occurrence.title,
            );

            let accumulated = self.errors.entry(test_key).or_default();
            accumulated.extend(occurrence.errors.iter().cloned());

            let is_hook = occurrence.is_hook();
            let test = TestRecord {
                title: occurrence.title,
                duration: occurrence.duration,
                passed: occurrence.passed,
                retries: occurrence.retries,
                failed: occurrence.failed,
                skipped: occurrence.skipped,
                errors: accumulated.clone(),
            };

            if is_hook {
                self.hooks.entry(suite_key.clone()).or_default().push(test);
            } else {
                suite.tests.push(test);
            }
        }
    }

    /// Suites in encounter order, hooks appended after regular tests.
    fn finish(mut self) -> Vec<SuiteRecord> {
        self.order
            .iter()
            .filter_map(|key| {
                let mut suite = self.suites.remove(key)?;
                if let Some(hooks) = self.hooks.remove(key) {
                    suite.tests.extend(hooks);
                }
                Some(suite)
            })
            .collect()
    }
}
