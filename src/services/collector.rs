//! Artifact discovery and suite matching.
//!
//! Screenshots and videos are associated with suites by file name. The
//! default [`SpecNameMatcher`] policy:
//! 1. The artifact name is lowercased.
//! 2. Suites are tried in report order; the first whose lowercased spec base
//!    name (no directory, no extension) occurs in the artifact name and has a
//!    ledger id wins. Overlapping base names are not disambiguated.
//! 3. Without a match, the first suite of the report is used.
//! 4. Without suites (or ledger ids) the artifact is dropped.
//!
//! Association is suite-granular: the test id is never set.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::models::artifact::{dotted_extension, mime_type_for_extension};
use crate::models::{Artifact, ArtifactType, Association, RunReport, RunResult, SuiteRecord};
use crate::services::diagnostics::{Diagnostics, Stage};

/// Strategy associating an artifact file with a submitted suite.
pub trait SuiteMatcher: Send + Sync {
    fn match_file(
        &self,
        filename: &str,
        suites: &[SuiteRecord],
        result: &RunResult,
    ) -> Option<Association>;
}

/// Spec-file-name substring matching with first-suite fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecNameMatcher;

impl SuiteMatcher for SpecNameMatcher {
    fn match_file(
        &self,
        filename: &str,
        suites: &[SuiteRecord],
        result: &RunResult,
    ) -> Option<Association> {
        match_file_to_suite(filename, suites, result)
    }
}

/// Lowercased spec file name without directory and last extension.
pub fn spec_base_name(spec_file: &str) -> String {
    Path::new(spec_file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Associate `filename` with a suite; see the module docs for the policy.
pub fn match_file_to_suite(
    filename: &str,
    suites: &[SuiteRecord],
    result: &RunResult,
) -> Option<Association> {
    let lower_filename = filename.to_lowercase();

    suites
        .iter()
        .filter(|suite| lower_filename.contains(&spec_base_name(&suite.spec_file)))
        .find_map(|suite| result.suite_id(suite))
        .or_else(|| suites.first().and_then(|suite| result.suite_id(suite)))
        .map(|suite_id| Association {
            suite_id: suite_id.clone(),
            test_id: None,
        })
}

/// Recursively find files under `dir` whose extension is in `extensions`.
///
/// Entries are visited in name order so repeated scans agree.
pub fn find_files(dir: &Path, extensions: &[&str], diagnostics: &mut Diagnostics) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            diagnostics.record(
                Stage::Collection,
                format!("Failed to read {}: {}", dir.display(), e),
            );
            return files;
        }
    };

    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

        if is_dir {
            files.extend(find_files(&path, extensions, diagnostics));
        } else if let Some(ext) = dotted_extension(&path)
            && extensions.contains(&ext.as_str())
        {
            files.push(path);
        }
    }

    files
}

/// Discovers artifacts and associates them with submitted suites.
pub struct ArtifactCollector {
    matcher: Box<dyn SuiteMatcher>,
}

impl Default for ArtifactCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactCollector {
    pub fn new() -> Self {
        Self::with_matcher(SpecNameMatcher)
    }

    pub fn with_matcher(matcher: impl SuiteMatcher + 'static) -> Self {
        ArtifactCollector {
            matcher: Box::new(matcher),
        }
    }

    /// Collect screenshots and videos from the configured directories.
    ///
    /// Missing directories are ignored. Size and mime type are resolved here,
    /// not at upload time.
    pub fn collect(
        &self,
        report: &RunReport,
        result: &RunResult,
        screenshot_dir: Option<&Path>,
        video_dir: Option<&Path>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Artifact> {
        let mut artifacts = Vec::new();

        for (artifact_type, dir) in [
            (ArtifactType::Screenshot, screenshot_dir),
            (ArtifactType::Video, video_dir),
        ] {
            let Some(dir) = dir else {
                continue;
            };
            if !dir.is_dir() {
                debug!("{} directory {} does not exist", artifact_type, dir.display());
                continue;
            }

            for path in find_files(dir, artifact_type.extensions(), diagnostics) {
                if let Some(artifact) =
                    self.build_artifact(artifact_type, path, report, result, diagnostics)
                {
                    artifacts.push(artifact);
                }
            }
        }

        info!("Collected {} artifacts", artifacts.len());
        artifacts
    }

    fn build_artifact(
        &self,
        artifact_type: ArtifactType,
        path: PathBuf,
        report: &RunReport,
        result: &RunResult,
        diagnostics: &mut Diagnostics,
    ) -> Option<Artifact> {
        let filename = path.file_name()?.to_string_lossy().into_owned();

        let Some(association) = self.matcher.match_file(&filename, &report.suites, result) else {
            debug!("No suite association for {}, dropping", filename);
            return None;
        };

        let mime_type = dotted_extension(&path)
            .as_deref()
            .and_then(mime_type_for_extension)?;

        let file_size = match std::fs::metadata(&path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                diagnostics.record(
                    Stage::Collection,
                    format!("Failed to stat {}: {}", path.display(), e),
                );
                return None;
            }
        };

        Some(Artifact {
            artifact_type,
            filename,
            path,
            mime_type: mime_type.to_string(),
            file_size,
            suite_id: association.suite_id,
            test_id: association.test_id,
        })
    }
}
