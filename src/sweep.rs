//! Stale artifact detection and cleanup.
//!
//! The get-or-create path never revisits an existing artifact, so files whose
//! source was deleted, or whose size was removed from the config, stay on
//! disk. The sweeper walks the transcoded tree and runs every file through
//! [`ArtifactProcessor::is_valid_derived_path`]; anything that fails is stale.
//!
//! Interrupted renders can leave `.render-*` temp files behind. A temp file is
//! only stale once it is older than [`ABANDONED_TEMP_AGE`]; younger ones may
//! belong to a render that is still running and are left alone.
//!
//! Person thumbnails are not swept: their hashed names cannot be mapped back
//! to a source.

use crate::imaging::TEMP_PREFIX;
use crate::processing::ArtifactProcessor;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Age after which a render temp file counts as abandoned.
pub const ABANDONED_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Cannot walk transcoded tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Only list stale files.
    Report,
    /// List and delete stale files.
    Delete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files visited under the transcoded root.
    pub scanned: usize,
    /// Files that no longer correspond to a legal artifact, in walk order.
    pub stale: Vec<PathBuf>,
    /// Stale files deleted (always 0 in report mode).
    pub removed: usize,
}

/// Walk the transcoded root and collect stale files without touching them.
pub fn find_stale(processor: &ArtifactProcessor) -> Result<SweepReport, SweepError> {
    let root = processor.paths().transcoded_root();
    let mut report = SweepReport::default();
    if !root.is_dir() {
        debug!(root = %root.display(), "transcoded root missing, nothing to sweep");
        return Ok(report);
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        report.scanned += 1;
        if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
            let abandoned = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .is_some_and(|modified| is_abandoned(modified, SystemTime::now()));
            if !abandoned {
                debug!(path = %entry.path().display(), "skipping in-progress render");
                continue;
            }
        } else if processor.is_valid_derived_path(entry.path()) {
            continue;
        }
        report.stale.push(entry.into_path());
    }
    Ok(report)
}

/// A temp file modified in the future is treated as in progress.
fn is_abandoned(modified: SystemTime, now: SystemTime) -> bool {
    now.duration_since(modified)
        .is_ok_and(|age| age >= ABANDONED_TEMP_AGE)
}

/// Find stale files and, in [`SweepMode::Delete`], remove them.
pub fn sweep(processor: &ArtifactProcessor, mode: SweepMode) -> Result<SweepReport, SweepError> {
    let mut report = find_stale(processor)?;
    if mode == SweepMode::Report {
        return Ok(report);
    }

    for path in &report.stale {
        match fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "removed stale artifact");
                report.removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "stale file already gone");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(report)
}
