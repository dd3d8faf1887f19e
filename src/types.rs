//! Shared types passed between the catalog, the orchestrator and the renderers.
//!
//! Everything here is plain data. Face regions and photo dimensions come from
//! the catalog and are never mutated by the engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Video container extensions accepted as thumbnail sources.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogv", "ogg"];

/// The three families of derived artifact.
///
/// The kind decides the path template (mirrored transcoded tree vs. flat
/// faces directory) and whether a crop rectangle is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    SizedThumbnail,
    ConvertedPhoto,
    PersonFaceThumbnail,
}

/// What kind of media a render job reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Photo,
    Video,
}

impl SourceKind {
    /// Classify a media file by extension (case-insensitive).
    ///
    /// Returns `None` for files that are neither a decodable photo nor a
    /// supported video container.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if crate::imaging::supported_input_extensions().contains(&ext.as_str()) {
            Some(SourceKind::Photo)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceKind::Video)
        } else {
            None
        }
    }
}

/// Pixel dimensions of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Bounding box of a detected face, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// A named face on a photo, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub name: String,
    #[serde(rename = "box")]
    pub face_box: FaceBox,
}

/// Catalog view of a photo needed to cut a person thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoInfo {
    /// Absolute path of the source file.
    pub path: PathBuf,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub faces: Vec<FaceRegion>,
}
