//! Rendering: geometry, job parameters and the two renderer variants.
//!
//! | Step | Where |
//! |---|---|
//! | **Short-side resize** | [`calculate_short_side_dimensions`] |
//! | **Face crop + clamping** | [`calculate_face_crop`] |
//! | **Encode policy** | [`EncodePolicy`] from the quality-priority flag |
//! | **Pixel work** | [`RustRenderer`] (`image` crate) or [`MagickRenderer`] (ImageMagick) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: [`RenderJob`] and the policy types it carries
//! - **Backend**: [`Renderer`] trait + [`RenderError`]
//! - **Renderers**: one per image library variant

pub mod backend;
mod calculations;
pub mod magick_backend;
mod params;
pub mod rust_backend;

use crate::config::ImageLibrary;
use std::path::Path;
use std::sync::Arc;

pub use backend::{RenderError, Renderer, TEMP_PREFIX};
pub use calculations::{
    calculate_face_crop, calculate_face_margin, calculate_short_side_dimensions, clamp_crop,
};
pub use magick_backend::MagickRenderer;
pub use params::{CropRect, EncodePolicy, Quality, RenderJob, Resampling};
pub use rust_backend::{RustRenderer, supported_input_extensions};

/// Instantiate the renderer for a configured library variant.
pub fn renderer_for(library: ImageLibrary, magick_binary: &Path) -> Arc<dyn Renderer> {
    match library {
        ImageLibrary::Image => Arc::new(RustRenderer::new()),
        ImageLibrary::Magick => Arc::new(MagickRenderer::new(magick_binary)),
    }
}
