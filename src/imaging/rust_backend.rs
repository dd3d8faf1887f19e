//! Pure Rust renderer, built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` |
//! | Orient | `DynamicImage::apply_orientation` from the EXIF tag |
//! | Crop | `DynamicImage::crop_imm` after [`clamp_crop`] |
//! | Resize | `DynamicImage::resize_exact` (short side) or `resize_to_fill` (square) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Atomic write | `tempfile::NamedTempFile::persist` |
//!
//! Crops are taken from the upright image, the same frame ImageMagick's
//! `-auto-orient` produces.
//!
//! Video sources are rejected: there is no pure Rust frame grabber in the
//! dependency stack. Use the `magick` library variant for video thumbnails.

use super::backend::{RenderError, Renderer, TEMP_PREFIX};
use super::calculations::{calculate_short_side_dimensions, clamp_crop};
use super::params::{RenderJob, Resampling};
use crate::types::SourceKind;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of photo file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust renderer using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-step mapping.
pub struct RustRenderer;

impl RustRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn filter_for(resampling: Resampling) -> FilterType {
    match resampling {
        Resampling::Lanczos3 => FilterType::Lanczos3,
        Resampling::Triangle => FilterType::Triangle,
    }
}

/// Load and decode an image from disk, rotated upright per its EXIF tag.
fn load_image(path: &Path) -> Result<DynamicImage, RenderError> {
    let unreadable = |reason: String| RenderError::SourceUnreadable {
        path: path.to_path_buf(),
        reason,
    };
    let mut decoder = ImageReader::open(path)
        .map_err(|e| unreadable(e.to_string()))?
        .with_guessed_format()?
        .into_decoder()
        .map_err(|e| unreadable(e.to_string()))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| unreadable(e.to_string()))?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Encode as JPEG into a temp file beside `path`, then rename into place.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), RenderError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut encoded = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, quality as u8);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| RenderError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".jpg")
        .tempfile_in(dir)?;
    tmp.write_all(&encoded)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| RenderError::Io(e.error))?;
    Ok(())
}

impl Renderer for RustRenderer {
    fn render(&self, job: &RenderJob) -> Result<(), RenderError> {
        if job.source_kind == SourceKind::Video {
            return Err(RenderError::Unsupported(format!(
                "video thumbnails need the magick renderer: {}",
                job.source.display()
            )));
        }

        let policy = job.encode_policy();
        let filter = filter_for(policy.resampling);
        let mut img = load_image(&job.source)?;

        if let Some(crop) = job.crop {
            let crop = clamp_crop(crop, (img.width(), img.height()));
            if crop.width == 0 || crop.height == 0 {
                return Err(RenderError::ProcessingFailed(format!(
                    "crop is empty after clamping to {}x{}",
                    img.width(),
                    img.height()
                )));
            }
            img = img.crop_imm(crop.left, crop.top, crop.width, crop.height);
        }

        let resized = if job.make_square {
            img.resize_to_fill(job.size, job.size, filter)
        } else {
            let (w, h) = calculate_short_side_dimensions((img.width(), img.height()), job.size);
            img.resize_exact(w, h, filter)
        };

        save_jpeg(&resized, &job.output, policy.quality.value())
    }
}
