//! ImageMagick renderer: native codecs through the `convert` binary.
//!
//! Each render spawns one `convert` process. ImageMagick parallelises
//! resizing internally, so the executor paired with this renderer runs jobs
//! in place instead of on dedicated worker threads.
//!
//! Video sources are read through ImageMagick's ffmpeg delegate; `[0]`
//! selects the first frame.

use super::backend::{RenderError, Renderer, TEMP_PREFIX};
use super::params::{RenderJob, Resampling};
use crate::types::SourceKind;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_MAGICK_BINARY: &str = "convert";

pub struct MagickRenderer {
    binary: PathBuf,
}

impl MagickRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for MagickRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAGICK_BINARY)
    }
}

/// Build the `convert` argument list for a job writing to `output`.
pub fn build_args(job: &RenderJob, output: &Path) -> Vec<OsString> {
    let policy = job.encode_policy();
    let mut args: Vec<OsString> = Vec::new();

    let mut input = job.source.clone().into_os_string();
    if job.source_kind == SourceKind::Video {
        input.push("[0]");
    }
    args.push(input);
    args.push("-auto-orient".into());

    if let Some(crop) = job.crop {
        args.push("-crop".into());
        args.push(format!("{}x{}+{}+{}", crop.width, crop.height, crop.left, crop.top).into());
        args.push("+repage".into());
    }

    args.push("-filter".into());
    args.push(
        match policy.resampling {
            Resampling::Lanczos3 => "Lanczos",
            Resampling::Triangle => "Triangle",
        }
        .into(),
    );

    // `^` fills: the shorter side reaches the target
    let fill = format!("{0}x{0}^", job.size);
    args.push("-resize".into());
    args.push(fill.into());
    if job.make_square {
        args.push("-gravity".into());
        args.push("center".into());
        args.push("-extent".into());
        args.push(format!("{0}x{0}", job.size).into());
    }

    args.push("-quality".into());
    args.push(policy.quality.value().to_string().into());

    let mut target = OsString::from("jpg:");
    target.push(output.as_os_str());
    args.push(target);
    args
}

impl Renderer for MagickRenderer {
    fn render(&self, job: &RenderJob) -> Result<(), RenderError> {
        if !job.source.is_file() {
            return Err(RenderError::SourceUnreadable {
                path: job.source.clone(),
                reason: "not a regular file".into(),
            });
        }

        let dir = job
            .output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;

        let tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".jpg")
            .tempfile_in(dir)?
            .into_temp_path();

        let out = Command::new(&self.binary)
            .args(build_args(job, &tmp))
            .output()
            .map_err(|e| {
                RenderError::ProcessingFailed(format!(
                    "failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !out.status.success() {
            return Err(RenderError::ProcessingFailed(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        tmp.persist(&job.output)
            .map_err(|e| RenderError::Io(e.error))?;
        Ok(())
    }
}
