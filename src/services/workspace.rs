//! Output directory lifecycle around a test run.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::services::diagnostics::{Diagnostics, Stage};

/// Marker file holding the run start time (RFC 3339).
pub const RUN_START_MARKER: &str = ".testledger-start";

/// Create or empty `dir`, then stamp the run start time into it.
pub async fn prepare_output_dir(dir: &Path, started_at: DateTime<Utc>) -> AppResult<()> {
    fs::create_dir_all(dir).await?;

    let mut entries = fs::read_dir(dir).await?;
    let mut removed = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            fs::remove_dir_all(entry.path()).await?;
        } else {
            fs::remove_file(entry.path()).await?;
        }
        removed += 1;
    }
    if removed > 0 {
        debug!("Removed {} stale entries from {}", removed, dir.display());
    }

    fs::write(dir.join(RUN_START_MARKER), started_at.to_rfc3339()).await?;
    info!("Prepared output directory {}", dir.display());
    Ok(())
}

/// Read the run start time written by [`prepare_output_dir`].
pub async fn read_run_start(dir: &Path, diagnostics: &mut Diagnostics) -> Option<DateTime<Utc>> {
    let marker = dir.join(RUN_START_MARKER);

    let raw = match fs::read_to_string(&marker).await {
        Ok(raw) => raw,
        Err(e) => {
            diagnostics.record(
                Stage::Prepare,
                format!("No run start marker at {}: {}", marker.display(), e),
            );
            return None;
        }
    };

    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(started_at) => Some(started_at.with_timezone(&Utc)),
        Err(e) => {
            diagnostics.record(
                Stage::Prepare,
                format!("Invalid run start marker {}: {}", marker.display(), e),
            );
            None
        }
    }
}
