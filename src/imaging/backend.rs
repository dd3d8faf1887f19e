//! Renderer trait and shared error type.
//!
//! The [`Renderer`] trait is the single seam between the orchestration code
//! and pixel work. Two implementations ship with the crate:
//!
//! | Renderer | Variant | Notes |
//! |---|---|---|
//! | [`RustRenderer`](super::rust_backend::RustRenderer) | `image` | pure Rust, runs on the calling thread |
//! | [`MagickRenderer`](super::magick_backend::MagickRenderer) | `magick` | shells out to ImageMagick, internally multi-threaded |
//!
//! Every renderer must leave either a complete file at `job.output` or no
//! file at all. The orchestrator treats "file exists" as "render finished".
//! Work in progress lives in a [`TEMP_PREFIX`] file beside the target until it
//! is renamed into place.

use super::params::RenderJob;
use std::path::PathBuf;
use thiserror::Error;

/// File name prefix of in-progress renders.
pub const TEMP_PREFIX: &str = ".render-";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read source {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Produces one artifact file from a [`RenderJob`].
///
/// Implementations are shared across executor threads, so they take `&self`
/// and must be `Send + Sync`.
pub trait Renderer: Send + Sync {
    fn render(&self, job: &RenderJob) -> Result<(), RenderError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::CropRect;
    use crate::types::SourceKind;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type JobPredicate = Box<dyn Fn(&RenderJob) -> bool + Send + Sync>;

    /// Mock renderer that records jobs and writes a placeholder output file.
    ///
    /// Also tracks how many renders overlap, so executor tests can assert the
    /// concurrency ceiling.
    #[derive(Default)]
    pub struct MockRenderer {
        pub jobs: Mutex<Vec<RenderJob>>,
        pub delay: Option<Duration>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        fail_when: Option<JobPredicate>,
        panic_when: Option<JobPredicate>,
    }

    impl MockRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_delay(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        pub fn failing_when(
            mut self,
            pred: impl Fn(&RenderJob) -> bool + Send + Sync + 'static,
        ) -> Self {
            self.fail_when = Some(Box::new(pred));
            self
        }

        pub fn panicking_when(
            mut self,
            pred: impl Fn(&RenderJob) -> bool + Send + Sync + 'static,
        ) -> Self {
            self.panic_when = Some(Box::new(pred));
            self
        }

        pub fn render_count(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }

        pub fn recorded(&self) -> Vec<RenderJob> {
            self.jobs.lock().unwrap().clone()
        }

        pub fn max_active(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }
    }

    impl Renderer for MockRenderer {
        fn render(&self, job: &RenderJob) -> Result<(), RenderError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.jobs.lock().unwrap().push(job.clone());

            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }

            let result = if self.panic_when.as_ref().is_some_and(|p| p(job)) {
                self.active.fetch_sub(1, Ordering::SeqCst);
                panic!("mock renderer panic for {}", job.source.display());
            } else if self.fail_when.as_ref().is_some_and(|p| p(job)) {
                Err(RenderError::ProcessingFailed(format!(
                    "mock failure for {}",
                    job.source.display()
                )))
            } else {
                if let Some(parent) = job.output.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&job.output, b"rendered").map_err(RenderError::from)
            };

            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    pub fn job(source: &str, output: &Path) -> RenderJob {
        RenderJob {
            source_kind: SourceKind::Photo,
            source: source.into(),
            output: output.to_path_buf(),
            size: 240,
            crop: None,
            make_square: false,
            quality_priority: true,
        }
    }

    #[test]
    fn mock_records_job_and_writes_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("nested/dawn.jpg_240.jpg");
        let renderer = MockRenderer::new();

        renderer.render(&job("/src/dawn.jpg", &output)).unwrap();

        assert!(output.exists());
        assert_eq!(renderer.render_count(), 1);
        assert_eq!(renderer.recorded()[0].size, 240);
    }

    #[test]
    fn mock_failure_leaves_no_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("bad.jpg_240.jpg");
        let renderer = MockRenderer::new().failing_when(|j| j.source.ends_with("bad.jpg"));

        let result = renderer.render(&job("/src/bad.jpg", &output));

        assert!(matches!(result, Err(RenderError::ProcessingFailed(_))));
        assert!(!output.exists());
    }

    #[test]
    fn mock_records_crop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let renderer = MockRenderer::new();
        let mut j = job("/src/face.jpg", &tmp.path().join("face.jpg"));
        j.crop = Some(CropRect {
            left: 1,
            top: 2,
            width: 3,
            height: 4,
        });

        renderer.render(&j).unwrap();

        assert_eq!(renderer.recorded()[0].crop.unwrap().height, 4);
    }
}
