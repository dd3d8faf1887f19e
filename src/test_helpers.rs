//! Shared test utilities for the thumbwright test suite.
//!
//! Provides synthetic source images and engine configs rooted in a temp
//! directory, so tests never touch a real photo collection.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let config = test_config(tmp.path());
//! let photo = add_photo(&config, "2023/dawn.jpg", 400, 300);
//! ```

use crate::config::EngineConfig;
use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Synthetic images
// =========================================================================

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a JPEG like [`create_test_jpeg`] carrying an EXIF orientation tag.
///
/// The pixels are stored `width`x`height`; a decoder that honours the tag
/// sees them rotated or flipped.
pub fn create_oriented_test_jpeg(path: &Path, width: u32, height: u32, orientation: u16) {
    create_test_jpeg(path, width, height);
    let jpeg = std::fs::read(path).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");

    // APP1 "Exif" segment: big-endian TIFF header, one IFD with tag 0x0112
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\0\x2A");
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0112u16.to_be_bytes());
    tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes());

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);
    let segment_len = (payload.len() + 2) as u16;

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    std::fs::write(path, out).unwrap();
}

// =========================================================================
// Configs
// =========================================================================

/// Default config with all three roots inside `root` and two render slots.
pub fn test_config(root: &Path) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.paths.images = root.join("images");
    config.paths.transcoded = root.join("transcoded");
    config.paths.faces = root.join("faces");
    config.threading.thumbnail_threads = 2;
    config
}

/// Write a synthetic JPEG at `rel` under the config's images root.
pub fn add_photo(config: &EngineConfig, rel: &str, width: u32, height: u32) -> PathBuf {
    let path = config.paths.images.join(rel);
    create_test_jpeg(&path, width, height);
    path
}
