//! # Thumbwright
//!
//! A get-or-create engine for derived photo artifacts: sized thumbnails,
//! downscaled "converted" previews, and person thumbnails cropped around a
//! tagged face. A gallery server asks for an artifact; if it is already on
//! disk the path comes straight back, otherwise it is rendered under a global
//! concurrency limit and then returned.
//!
//! # Architecture
//!
//! ```text
//! caller ──▶ ArtifactProcessor ──▶ ArtifactPaths     (deterministic target path)
//!                 │
//!                 ├─ cache hit ──▶ path
//!                 │
//!                 └─ miss ──▶ JobExecutor ──▶ Renderer ──▶ file on disk
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`processing`] | [`ArtifactProcessor`](processing::ArtifactProcessor): the get-or-create operations |
//! | [`paths`] | Path templates, face-key hashing, reverse validation of transcoded paths |
//! | [`executor`] | Bounded job execution: worker pool or slot-counting rayon pool |
//! | [`imaging`] | Crop/resize math, render jobs, `image` and ImageMagick renderers |
//! | [`sweep`] | Finds and removes transcoded files that are no longer legal artifacts |
//! | [`config`] | Layered `thumbwright.toml` loading and validation |
//! | [`types`] | Catalog-facing data: photos, face regions, source kinds |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Filesystem Is the Index
//!
//! Artifact paths are a pure function of the source path and the render
//! parameters, so there is no database of what has been rendered. A cache hit
//! is one readability check. The price is that a changed source is not
//! re-rendered automatically; the [`sweep`] module cleans up artifacts whose
//! source or size disappeared.
//!
//! ## Atomic Writes
//!
//! Renderers encode into a temp file beside the target and rename it into
//! place. A reader therefore sees either no file or a complete one, which is
//! what lets "file exists" stand in for "render finished".
//!
//! ## Two Executors
//!
//! The pure Rust renderer is CPU-bound on the calling thread, so it gets
//! dedicated worker threads that survive (and replace themselves after) a
//! renderer panic. ImageMagick parallelises internally; there a simple slot
//! counter is enough. [`executor::build_executor`] picks one from the config.
//!
//! ## No Global State
//!
//! Everything hangs off an explicit [`ArtifactProcessor`](processing::ArtifactProcessor)
//! value. Tests build as many independent processors as they like.

pub mod config;
pub mod executor;
pub mod imaging;
pub mod output;
pub mod paths;
pub mod processing;
pub mod sweep;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
