//! Screenshot and video artifacts and their upload bookkeeping.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::LedgerId;

/// Image extensions collected from the screenshot directory.
pub const SCREENSHOT_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// Video extensions collected from the video directory.
pub const VIDEO_EXTENSIONS: &[&str] = &[".webm", ".mp4", ".mov"];

/// Artifact media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Screenshot,
    Video,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screenshot => "screenshot",
            Self::Video => "video",
        }
    }

    /// Allow-listed extensions (lowercase, with leading dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Screenshot => SCREENSHOT_EXTENSIONS,
            Self::Video => VIDEO_EXTENSIONS,
        }
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowercased extension of a path, with leading dot.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

/// Mime type for an allow-listed extension.
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        ".png" => Some("image/png"),
        ".jpg" | ".jpeg" => Some("image/jpeg"),
        ".gif" => Some("image/gif"),
        ".webp" => Some("image/webp"),
        ".webm" => Some("video/webm"),
        ".mp4" => Some("video/mp4"),
        ".mov" => Some("video/quicktime"),
        _ => None,
    }
}

/// Suite (and optionally test) an artifact belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub suite_id: LedgerId,
    /// Always `None` today: matching is suite-granular.
    pub test_id: Option<LedgerId>,
}

/// A discovered file ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub artifact_type: ArtifactType,
    pub filename: String,
    pub path: PathBuf,
    pub mime_type: String,
    pub file_size: u64,
    pub suite_id: LedgerId,
    pub test_id: Option<LedgerId>,
}

impl Artifact {
    /// Wire description sent when requesting upload targets.
    pub fn descriptor(&self) -> ArtifactDescriptor<'_> {
        ArtifactDescriptor {
            test_run_suite_test_id: self.test_id.as_ref(),
            test_run_suite_id: &self.suite_id,
            artifact_type: self.artifact_type,
            filename: &self.filename,
            mime_type: &self.mime_type,
            file_size: self.file_size,
        }
    }
}

/// Artifact entry of `POST /artifacts/presigned-upload`.
#[derive(Debug, Serialize)]
pub struct ArtifactDescriptor<'a> {
    pub test_run_suite_test_id: Option<&'a LedgerId>,
    pub test_run_suite_id: &'a LedgerId,
    pub artifact_type: ArtifactType,
    pub filename: &'a str,
    pub mime_type: &'a str,
    pub file_size: u64,
}

/// One-time upload endpoint for one artifact.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadTarget {
    pub artifact_id: LedgerId,
    pub presigned_url: String,
}

/// Outcome of one transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub artifact_id: LedgerId,
    pub success: bool,
    pub error: Option<String>,
}

impl UploadResult {
    pub fn succeeded(artifact_id: LedgerId) -> Self {
        UploadResult {
            artifact_id,
            success: true,
            error: None,
        }
    }

    pub fn failed(artifact_id: LedgerId, error: impl Into<String>) -> Self {
        UploadResult {
            artifact_id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Summary of one artifact upload stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSummary {
    /// Artifacts handed to the uploader
    pub artifacts: usize,
    /// Upload targets the ledger returned
    pub targets: usize,
    /// Per-transfer outcomes, in target order
    pub results: Vec<UploadResult>,
    /// Ids named in the confirmation request (empty when none was sent)
    pub confirmed_ids: Vec<LedgerId>,
    /// Whether the confirmation request succeeded
    pub confirmed: bool,
}

impl UploadSummary {
    pub fn transferred(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}
