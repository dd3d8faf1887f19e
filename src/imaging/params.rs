//! Parameter types for render jobs.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the orchestrator (which decides which artifact is missing) and the
//! [`Renderer`](super::backend::Renderer) implementations (which do the pixel
//! work). Keeping them backend-neutral lets the executor tests run against a
//! mock renderer.
//!
//! ## Types
//!
//! - [`Quality`]: lossy JPEG quality (1–100). Clamped on construction.
//! - [`Resampling`]: resize filter, independent of any imaging crate.
//! - [`EncodePolicy`]: quality + filter pair chosen by the quality-priority flag.
//! - [`CropRect`]: region of the source to keep before resizing.
//! - [`RenderJob`]: full description of one artifact to produce.

use crate::types::SourceKind;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Resize filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    Lanczos3,
    Triangle,
}

/// Encoder settings derived from the `quality_priority` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodePolicy {
    pub quality: Quality,
    pub resampling: Resampling,
}

impl EncodePolicy {
    /// Quality priority trades encode time for fidelity: Lanczos3 at q90.
    /// Otherwise a cheaper triangle filter at q75.
    pub fn for_priority(quality_priority: bool) -> Self {
        if quality_priority {
            Self {
                quality: Quality::new(90),
                resampling: Resampling::Lanczos3,
            }
        } else {
            Self {
                quality: Quality::new(75),
                resampling: Resampling::Triangle,
            }
        }
    }
}

/// Rectangle cut out of the source before resizing, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// One unit of rendering work.
///
/// Built by the orchestrator on a cache miss, handed to the executor, and
/// dropped once the renderer returns.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub source_kind: SourceKind,
    pub source: PathBuf,
    pub output: PathBuf,
    /// Target length of the shorter output side.
    pub size: u32,
    pub crop: Option<CropRect>,
    /// Cover `size`×`size` and center-crop instead of keeping the aspect ratio.
    pub make_square: bool,
    pub quality_priority: bool,
}

impl RenderJob {
    pub fn encode_policy(&self) -> EncodePolicy {
        EncodePolicy::for_priority(self.quality_priority)
    }
}
