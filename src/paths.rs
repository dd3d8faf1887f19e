//! Deterministic artifact paths.
//!
//! Every artifact has exactly one location, computed from the source path and
//! the render parameters. Nothing else is stored: the filesystem *is* the
//! cache index, so a lookup is a path computation plus a readability check.
//!
//! ## Layout
//!
//! ```text
//! images/2023/trip/dawn.jpg                  (source)
//! transcoded/2023/trip/dawn.jpg_240.jpg      (sized thumbnail)
//! transcoded/2023/trip/dawn.jpg_1080.jpg     (converted photo)
//! faces/3f2a…9c_200.jpg                      (person thumbnail)
//! ```
//!
//! Person thumbnails are keyed by a hash of `(photo, face name, box origin)`
//! so two faces on the same photo never collide, and the name carries no
//! information about the source file.
//!
//! ## Validation
//!
//! [`ArtifactPaths::is_valid_derived_path`] runs the derivation backwards so a
//! cache sweeper can decide whether a file in the transcoded tree still
//! corresponds to a legal artifact of an existing source.

use crate::config::EngineConfig;
use crate::types::FaceRegion;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Extension of every derived artifact.
pub const ARTIFACT_EXTENSION: &str = "jpg";

/// Sizes that may legally appear in a transcoded file name.
///
/// Built from the current config on every validation: a size removed from
/// the config immediately makes its artifacts stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeRegistry {
    pub thumbnail_sizes: Vec<u32>,
    pub icon_size: u32,
    pub conversion_resolution: u32,
}

impl SizeRegistry {
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut thumbnail_sizes = config.thumbnails.sizes.clone();
        thumbnail_sizes.sort_unstable();
        thumbnail_sizes.dedup();
        Self {
            thumbnail_sizes,
            icon_size: config.thumbnails.icon_size,
            conversion_resolution: config.converting.resolution,
        }
    }

    pub fn is_legal(&self, size: u32) -> bool {
        size == self.icon_size
            || size == self.conversion_resolution
            || self.thumbnail_sizes.contains(&size)
    }
}

/// The three artifact roots plus the source root they mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    images: PathBuf,
    transcoded: PathBuf,
    faces: PathBuf,
}

impl ArtifactPaths {
    pub fn new(
        images: impl Into<PathBuf>,
        transcoded: impl Into<PathBuf>,
        faces: impl Into<PathBuf>,
    ) -> Self {
        Self {
            images: images.into(),
            transcoded: transcoded.into(),
            faces: faces.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            &config.paths.images,
            &config.paths.transcoded,
            &config.paths.faces,
        )
    }

    pub fn images_root(&self) -> &Path {
        &self.images
    }

    pub fn transcoded_root(&self) -> &Path {
        &self.transcoded
    }

    pub fn faces_root(&self) -> &Path {
        &self.faces
    }

    /// Directory of `media_path` relative to the images root, or `None` when
    /// the source is not cleanly inside it (outside the root, or reaching
    /// out of it through `..`).
    ///
    /// Only sources with a relative directory round-trip through
    /// [`is_valid_derived_path`](Self::is_valid_derived_path).
    pub fn relative_source_dir(&self, media_path: &Path) -> Option<PathBuf> {
        let parent = media_path.parent()?;
        let rel = parent.strip_prefix(&self.images).ok()?;
        rel.components()
            .all(|c| matches!(c, Component::Normal(_)))
            .then(|| rel.to_path_buf())
    }

    /// Normal components of the source directory below the images root.
    ///
    /// Anything else (`..`, a root, a prefix) is dropped, so the result never
    /// escapes the transcoded root.
    fn relative_dir(&self, media_path: &Path) -> PathBuf {
        let parent = media_path.parent().unwrap_or(Path::new(""));
        let rel = parent.strip_prefix(&self.images).unwrap_or(parent);
        rel.components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect()
    }

    /// `transcoded/<relative dir>/<basename>_<size>.jpg`
    pub fn sized_thumbnail_path(&self, media_path: &Path, size: u32) -> PathBuf {
        let file = media_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.transcoded
            .join(self.relative_dir(media_path))
            .join(format!("{}_{}.{}", file, size, ARTIFACT_EXTENSION))
    }

    /// Same template as a sized thumbnail, at the conversion resolution.
    pub fn converted_photo_path(&self, media_path: &Path, resolution: u32) -> PathBuf {
        self.sized_thumbnail_path(media_path, resolution)
    }

    /// `faces/<hash>_<size>.jpg`
    pub fn person_face_thumbnail_path(
        &self,
        media_path: &Path,
        face: &FaceRegion,
        size: u32,
    ) -> PathBuf {
        let key = format!(
            "{}_{}_{}_{}",
            media_path.to_string_lossy(),
            face.name,
            face.face_box.left,
            face.face_box.top
        );
        self.faces.join(format!(
            "{}_{}.{}",
            face_key_hash(&key),
            size,
            ARTIFACT_EXTENSION
        ))
    }

    /// Whether `candidate` is a transcoded artifact that should still exist.
    ///
    /// False when the path is outside the transcoded root, when the size
    /// suffix is not the canonical decimal form of an integer (`05`, `+5` and
    /// `abc` are all rejected), when the size is not legal under `registry`,
    /// or when the reconstructed source is not a readable file.
    pub fn is_valid_derived_path(&self, candidate: &Path, registry: &SizeRegistry) -> bool {
        let Some((source, size)) = self.parse_derived_path(candidate) else {
            return false;
        };
        registry.is_legal(size) && is_readable(&source)
    }

    /// Split a transcoded path back into (source path, size).
    fn parse_derived_path(&self, candidate: &Path) -> Option<(PathBuf, u32)> {
        let rel = candidate.strip_prefix(&self.transcoded).ok()?;
        let stem = candidate.file_stem()?.to_str()?;
        let (source_name, size_str) = stem.rsplit_once('_')?;
        if source_name.is_empty() {
            return None;
        }

        let size: u32 = size_str.parse().ok()?;
        if size.to_string() != size_str {
            return None;
        }

        let rel_dir = rel.parent().unwrap_or(Path::new(""));
        Some((self.images.join(rel_dir).join(source_name), size))
    }
}

/// Hex digest used for person thumbnail names: SHA-256 truncated to 128 bits.
pub fn face_key_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..16])
}

/// True if `path` is a regular file that can be opened for reading.
pub fn is_readable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file()) && fs::File::open(path).is_ok()
}
