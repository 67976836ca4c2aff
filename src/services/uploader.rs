//! Artifact upload protocol.
//!
//! 1. Request presigned targets for all artifacts in one call.
//! 2. PUT each artifact's bytes to its target, pairing by position.
//! 3. Confirm the artifact ids whose transfer succeeded.
//!
//! Failures never abort the run: a failed transfer only excludes that
//! artifact from confirmation, and request or confirm failures are recorded
//! as diagnostics.

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::{Artifact, LedgerId, UploadResult, UploadSummary, UploadTarget};
use crate::services::diagnostics::{Diagnostics, Stage};
use crate::services::ledger::LedgerClient;

/// Uploads collected artifacts through presigned URLs.
#[derive(Debug, Clone)]
pub struct ArtifactUploader {
    ledger: LedgerClient,
    max_concurrent_transfers: usize,
}

impl ArtifactUploader {
    /// `max_concurrent_transfers` is clamped to at least one.
    pub fn new(ledger: LedgerClient, max_concurrent_transfers: usize) -> Self {
        ArtifactUploader {
            ledger,
            max_concurrent_transfers: max_concurrent_transfers.max(1),
        }
    }

    pub async fn upload(&self, artifacts: &[Artifact], diagnostics: &mut Diagnostics) -> UploadSummary {
        let mut summary = UploadSummary {
            artifacts: artifacts.len(),
            ..UploadSummary::default()
        };

        if artifacts.is_empty() {
            info!("No artifacts to upload");
            return summary;
        }

        let targets = match self.ledger.request_upload_targets(artifacts).await {
            Ok(targets) => targets,
            Err(e) => {
                diagnostics.record(
                    Stage::Upload,
                    format!("Failed to request upload URLs: {}", e),
                );
                return summary;
            }
        };
        summary.targets = targets.len();

        if targets.is_empty() {
            info!("Ledger returned no upload targets");
            return summary;
        }
        if targets.len() != artifacts.len() {
            warn!(
                "Ledger returned {} upload targets for {} artifacts",
                targets.len(),
                artifacts.len()
            );
        }

        info!(
            "Uploading {} artifacts ({} at a time)",
            targets.len(),
            self.max_concurrent_transfers
        );

        let results: Vec<UploadResult> = stream::iter(
            targets
                .iter()
                .enumerate()
                .map(|(index, target)| self.transfer_one(target, artifacts.get(index))),
        )
        .buffered(self.max_concurrent_transfers)
        .collect()
        .await;

        for result in results.iter().filter(|r| !r.success) {
            diagnostics.record(
                Stage::Upload,
                format!(
                    "Failed to upload artifact {}: {}",
                    result.artifact_id,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            );
        }

        let confirmed_ids = confirmation_set(&results);
        summary.results = results;

        if !confirmed_ids.is_empty() {
            match self.ledger.confirm_uploads(&confirmed_ids).await {
                Ok(()) => {
                    info!("Confirmed {} uploaded artifacts", confirmed_ids.len());
                    summary.confirmed = true;
                }
                Err(e) => diagnostics.record(
                    Stage::Upload,
                    format!("Failed to confirm uploads: {}", e),
                ),
            }
        }
        summary.confirmed_ids = confirmed_ids;

        summary
    }

    async fn transfer_one(&self, target: &UploadTarget, artifact: Option<&Artifact>) -> UploadResult {
        let artifact_id = target.artifact_id.clone();

        let Some(artifact) = artifact else {
            return UploadResult::failed(artifact_id, "no artifact for upload target");
        };

        match self.put_artifact(target, artifact).await {
            Ok(()) => UploadResult::succeeded(artifact_id),
            Err(e) => UploadResult::failed(artifact_id, e.to_string()),
        }
    }

    async fn put_artifact(&self, target: &UploadTarget, artifact: &Artifact) -> AppResult<()> {
        let data = tokio::fs::read(&artifact.path).await?;
        self.ledger
            .put_object(&target.presigned_url, data, &artifact.mime_type)
            .await
    }
}

/// Ids to confirm: successful transfers only, first occurrence order, no duplicates.
pub fn confirmation_set(results: &[UploadResult]) -> Vec<LedgerId> {
    let mut ids: Vec<LedgerId> = Vec::new();
    for result in results.iter().filter(|r| r.success) {
        if !ids.contains(&result.artifact_id) {
            ids.push(result.artifact_id.clone());
        }
    }
    ids
}
