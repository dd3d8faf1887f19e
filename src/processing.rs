//! Get-or-create orchestration of derived artifacts.
//!
//! [`ArtifactProcessor`] is the engine's public entry point. Every operation
//! follows the same protocol:
//!
//! ```text
//! derive target path ──▶ readable? ──yes──▶ return path (no render)
//!                            │
//!                            no
//!                            ▼
//!             build RenderJob ──▶ mkdir -p ──▶ submit ──▶ wait ──▶ return path
//! ```
//!
//! An existing artifact is never re-checked against its source: deterministic
//! paths make "the file exists" the whole cache-hit test. Staleness is handled
//! out of band by the [`sweep`](crate::sweep) module.
//!
//! Precondition failures (wrong face count, converting disabled, a source
//! outside the images root) are returned before anything is submitted. Render failures come back from the executor
//! and propagate as [`ProcessError::Render`]. Nothing is retried.
//!
//! ## Concurrency
//!
//! The processor is `Send + Sync`; callers on many threads share one value.
//! Identical concurrent requests are not merged: both render, and the last
//! atomic rename wins with an equivalent file.

use crate::config::{ConfigError, EngineConfig};
use crate::executor::{ExecutorError, JobExecutor, build_executor};
use crate::imaging::{RenderJob, Renderer, calculate_face_crop, renderer_for};
use crate::paths::{ArtifactPaths, SizeRegistry, is_readable};
use crate::types::{ArtifactKind, PhotoInfo, SourceKind};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Person thumbnail needs exactly one face, found {found}")]
    FaceCount { found: usize },
    #[error("Face '{name}' lies outside the {width}x{height} photo")]
    FaceOutOfBounds { name: String, width: u32, height: u32 },
    #[error("Source is not inside the images root: {}", path.display())]
    OutsideImagesRoot { path: PathBuf },
    #[error("Photo converting is disabled")]
    ConvertingDisabled,
    #[error("Render failed: {0}")]
    Render(#[from] ExecutorError),
    #[error("Executor setup failed: {0}")]
    Setup(#[source] ExecutorError),
}

/// Engine entry point: derives artifact paths and renders what is missing.
pub struct ArtifactProcessor {
    config: EngineConfig,
    paths: ArtifactPaths,
    registry: SizeRegistry,
    executor: Box<dyn JobExecutor>,
}

impl ArtifactProcessor {
    /// Build a processor around `renderer`, with the executor strategy and
    /// capacity the config calls for.
    pub fn new(config: EngineConfig, renderer: Arc<dyn Renderer>) -> Result<Self, ProcessError> {
        config.validate()?;
        let executor = build_executor(&config, renderer).map_err(ProcessError::Setup)?;
        Ok(Self::assemble(config, executor))
    }

    /// Build a processor with the renderer for the configured image library.
    pub fn from_config(config: EngineConfig) -> Result<Self, ProcessError> {
        let renderer = renderer_for(config.processing.library, &config.processing.magick_binary);
        Self::new(config, renderer)
    }

    /// Build a processor around a caller-supplied executor.
    pub fn with_executor(
        config: EngineConfig,
        executor: Box<dyn JobExecutor>,
    ) -> Result<Self, ProcessError> {
        config.validate()?;
        Ok(Self::assemble(config, executor))
    }

    fn assemble(config: EngineConfig, executor: Box<dyn JobExecutor>) -> Self {
        Self {
            paths: ArtifactPaths::from_config(&config),
            registry: SizeRegistry::from_config(&config),
            config,
            executor,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn size_registry(&self) -> &SizeRegistry {
        &self.registry
    }

    /// Renders allowed in flight at once.
    pub fn concurrency(&self) -> usize {
        self.executor.capacity()
    }

    /// Sized thumbnail of a photo or video, rendered if missing.
    pub fn get_or_create_thumbnail(
        &self,
        media_path: &Path,
        size: u32,
        source_kind: SourceKind,
        make_square: bool,
    ) -> Result<PathBuf, ProcessError> {
        self.check_inside_images(media_path)?;
        let output = self.paths.sized_thumbnail_path(media_path, size);
        if self.is_cached(ArtifactKind::SizedThumbnail, &output) {
            return Ok(output);
        }

        let job = RenderJob {
            source_kind,
            source: media_path.to_path_buf(),
            output,
            size,
            crop: None,
            make_square,
            quality_priority: self.config.thumbnails.quality_priority,
        };
        self.render(ArtifactKind::SizedThumbnail, job)
    }

    /// Downscaled copy of a photo at the conversion resolution.
    pub fn get_or_create_converted_photo(
        &self,
        media_path: &Path,
    ) -> Result<PathBuf, ProcessError> {
        if !self.config.converting.enabled {
            return Err(ProcessError::ConvertingDisabled);
        }
        self.check_inside_images(media_path)?;

        let resolution = self.config.converting.resolution;
        let output = self.paths.converted_photo_path(media_path, resolution);
        if self.is_cached(ArtifactKind::ConvertedPhoto, &output) {
            return Ok(output);
        }

        let job = RenderJob {
            source_kind: SourceKind::Photo,
            source: media_path.to_path_buf(),
            output,
            size: resolution,
            crop: None,
            make_square: false,
            quality_priority: self.config.thumbnails.quality_priority,
        };
        self.render(ArtifactKind::ConvertedPhoto, job)
    }

    /// Thumbnail cropped around the single face tagged on `photo`.
    pub fn get_or_create_person_thumbnail(
        &self,
        photo: &PhotoInfo,
    ) -> Result<PathBuf, ProcessError> {
        let [face] = photo.faces.as_slice() else {
            return Err(ProcessError::FaceCount {
                found: photo.faces.len(),
            });
        };

        let size = self.config.thumbnails.person_size;
        let output = self.paths.person_face_thumbnail_path(&photo.path, face, size);
        if self.is_cached(ArtifactKind::PersonFaceThumbnail, &output) {
            return Ok(output);
        }

        let crop = calculate_face_crop(
            &face.face_box,
            photo.dimensions,
            self.config.thumbnails.person_face_margin,
        );
        if crop.width == 0 || crop.height == 0 {
            return Err(ProcessError::FaceOutOfBounds {
                name: face.name.clone(),
                width: photo.dimensions.width,
                height: photo.dimensions.height,
            });
        }

        let job = RenderJob {
            source_kind: SourceKind::Photo,
            source: photo.path.clone(),
            output,
            size,
            crop: Some(crop),
            make_square: false,
            quality_priority: self.config.thumbnails.quality_priority,
        };
        self.render(ArtifactKind::PersonFaceThumbnail, job)
    }

    /// Whether a file in the transcoded tree is still a legal artifact of an
    /// existing source under the current config.
    pub fn is_valid_derived_path(&self, candidate: &Path) -> bool {
        self.paths.is_valid_derived_path(candidate, &self.registry)
    }

    /// Transcoded artifacts only exist for sources under the images root.
    fn check_inside_images(&self, media_path: &Path) -> Result<(), ProcessError> {
        match self.paths.relative_source_dir(media_path) {
            Some(_) => Ok(()),
            None => Err(ProcessError::OutsideImagesRoot {
                path: media_path.to_path_buf(),
            }),
        }
    }

    fn is_cached(&self, kind: ArtifactKind, output: &Path) -> bool {
        let hit = is_readable(output);
        if hit {
            debug!(?kind, path = %output.display(), "artifact cache hit");
        }
        hit
    }

    fn render(&self, kind: ArtifactKind, job: RenderJob) -> Result<PathBuf, ProcessError> {
        if let Some(dir) = job.output.parent() {
            fs::create_dir_all(dir)?;
        }

        let output = job.output.clone();
        debug!(?kind, source = %job.source.display(), size = job.size, "submitting render");
        self.executor.submit(job).wait().inspect_err(|e| {
            warn!(?kind, path = %output.display(), error = %e, "render failed");
        })?;
        Ok(output)
    }
}
