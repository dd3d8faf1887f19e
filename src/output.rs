//! CLI output formatting.
//!
//! Each command has a `format_*` function returning display lines, and `main`
//! prints them. Format functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## thumbnail / convert / face
//!
//! ```text
//! thumbnail 480px → cache/transcoded/2023/dawn.jpg_480.jpg
//! ```
//!
//! ## check
//!
//! ```text
//! valid: cache/transcoded/2023/dawn.jpg_480.jpg
//! stale: cache/transcoded/2023/dawn.jpg_999.jpg
//! ```
//!
//! ## sweep
//!
//! ```text
//! Stale artifacts
//! 001 2023/dawn.jpg_999.jpg
//! 002 old/dusk.jpg_240.jpg
//!
//! Scanned 14 files, 2 stale, 2 removed
//! ```

use crate::sweep::{SweepMode, SweepReport};
use crate::types::ArtifactKind;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn kind_label(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::SizedThumbnail => "thumbnail",
        ArtifactKind::ConvertedPhoto => "converted",
        ArtifactKind::PersonFaceThumbnail => "face",
    }
}

/// One line naming the artifact that a get-or-create call returned.
pub fn format_artifact(kind: ArtifactKind, size: u32, path: &Path) -> String {
    format!("{} {}px → {}", kind_label(kind), size, path.display())
}

/// Verdict line for `check`.
pub fn format_check(path: &Path, valid: bool) -> String {
    let verdict = if valid { "valid" } else { "stale" };
    format!("{}: {}", verdict, path.display())
}

/// Sweep listing: stale files relative to `root`, then a summary line.
pub fn format_sweep_report(report: &SweepReport, root: &Path, mode: SweepMode) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.stale.is_empty() {
        lines.push("Stale artifacts".to_string());
        for (i, path) in report.stale.iter().enumerate() {
            let shown = path.strip_prefix(root).unwrap_or(path);
            lines.push(format!("{} {}", format_index(i + 1), shown.display()));
        }
        lines.push(String::new());
    }

    let mut summary = format!(
        "Scanned {} files, {} stale",
        report.scanned,
        report.stale.len()
    );
    match mode {
        SweepMode::Delete => summary.push_str(&format!(", {} removed", report.removed)),
        SweepMode::Report if !report.stale.is_empty() => {
            summary.push_str(" (run with --delete to remove)")
        }
        SweepMode::Report => {}
    }
    lines.push(summary);
    lines
}
