//! Pure geometry for render jobs.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::CropRect;
use crate::types::{Dimensions, FaceBox};

/// Calculate output dimensions so the shorter side equals `size`.
///
/// The longer side keeps the source aspect ratio, rounded to the nearest
/// pixel. Sources smaller than `size` are scaled up.
///
/// # Examples
/// ```
/// # use thumbwright::imaging::calculate_short_side_dimensions;
/// // Landscape 4000x3000 at 480 → 640x480
/// assert_eq!(calculate_short_side_dimensions((4000, 3000), 480), (640, 480));
///
/// // Portrait 3000x4000 at 240 → 240x320
/// assert_eq!(calculate_short_side_dimensions((3000, 4000), 240), (240, 320));
/// ```
pub fn calculate_short_side_dimensions(source: (u32, u32), size: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return (size, size);
    }

    if src_w <= src_h {
        // Portrait or square: width is the short side
        let h = (size as f64 * src_h as f64 / src_w as f64).round() as u32;
        (size, h.max(1))
    } else {
        let w = (size as f64 * src_w as f64 / src_h as f64).round() as u32;
        (w.max(1), size)
    }
}

/// Margin added around a face box on each axis: `round(dimension * ratio)`.
pub fn calculate_face_margin(face: &FaceBox, margin_ratio: f64) -> (u32, u32) {
    let x = (face.width as f64 * margin_ratio).round() as u32;
    let y = (face.height as f64 * margin_ratio).round() as u32;
    (x, y)
}

/// Crop rectangle for a person thumbnail.
///
/// The face box is grown by the margin, half of it on each side. The origin
/// never goes negative; if the grown box overhangs the right or bottom edge,
/// width and height shrink rather than the origin moving, which keeps the
/// face as centred as the bounds allow.
pub fn calculate_face_crop(face: &FaceBox, image: Dimensions, margin_ratio: f64) -> CropRect {
    let (margin_x, margin_y) = calculate_face_margin(face, margin_ratio);

    let left = (face.left as f64 - margin_x as f64 / 2.0).max(0.0).round() as u32;
    let top = (face.top as f64 - margin_y as f64 / 2.0).max(0.0).round() as u32;

    let width = face
        .width
        .saturating_add(margin_x)
        .min(image.width.saturating_sub(left));
    let height = face
        .height
        .saturating_add(margin_y)
        .min(image.height.saturating_sub(top));

    CropRect {
        left,
        top,
        width,
        height,
    }
}

/// Clamp an arbitrary crop to the source bounds.
///
/// Renderers call this before cutting, so a catalog that reports
/// stale dimensions cannot make a crop read outside the decoded image.
pub fn clamp_crop(crop: CropRect, image: (u32, u32)) -> CropRect {
    let (img_w, img_h) = image;
    let left = crop.left.min(img_w);
    let top = crop.top.min(img_h);
    CropRect {
        left,
        top,
        width: crop.width.min(img_w - left),
        height: crop.height.min(img_h - top),
    }
}
