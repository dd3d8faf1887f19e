//! Bounded execution of render jobs.
//!
//! The orchestrator hands a [`RenderJob`] to a [`JobExecutor`] and blocks on
//! the returned [`JobHandle`]. Two strategies implement the trait:
//!
//! | Strategy | Runs jobs on | Picked when |
//! |---|---|---|
//! | [`WorkerPoolExecutor`] | long-lived named worker threads | threading on, `image` renderer |
//! | [`BoundedExecutor`] | a dedicated rayon pool, one runner per slot | otherwise |
//!
//! Both admit at most `capacity` renders at once and start queued jobs in
//! submission order. Completion order is unspecified. A failing or panicking
//! render only ever resolves its own handle with an error.

pub mod bounded;
pub mod worker_pool;

use crate::config::{EngineConfig, ImageLibrary, effective_concurrency};
use crate::imaging::{RenderError, RenderJob, Renderer};
use std::any::Any;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use thiserror::Error;
use tracing::debug;

pub use bounded::BoundedExecutor;
pub use worker_pool::WorkerPoolExecutor;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
    #[error("Renderer panicked: {0}")]
    Panicked(String),
    #[error("Worker crashed: {0}")]
    WorkerCrashed(String),
    #[error("No worker available to run the job")]
    WorkerUnavailable,
    #[error("Executor dropped the job without a result")]
    Disconnected,
    #[error("Failed to start executor: {0}")]
    Pool(String),
}

pub type JobResult = Result<(), ExecutorError>;

/// Accepts render jobs and runs them with bounded concurrency.
pub trait JobExecutor: Send + Sync {
    /// Queue a job. Never blocks and never rejects; errors arrive on the handle.
    fn submit(&self, job: RenderJob) -> JobHandle;

    /// Maximum number of renders in flight.
    fn capacity(&self) -> usize;
}

/// Completion side of a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    rx: Receiver<JobResult>,
}

impl JobHandle {
    /// A handle that is already resolved with `result`.
    pub fn resolved(result: JobResult) -> Self {
        let (done, handle) = completion_pair();
        done.complete(result);
        handle
    }

    /// Block until the job finishes.
    pub fn wait(self) -> JobResult {
        self.rx.recv().unwrap_or(Err(ExecutorError::Disconnected))
    }

    /// Non-blocking poll. Returns `None` while the job is still pending.
    ///
    /// The result is handed out once; polling again after that reports
    /// [`ExecutorError::Disconnected`].
    pub fn try_wait(&self) -> Option<JobResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ExecutorError::Disconnected)),
        }
    }
}

/// Sending half paired with a [`JobHandle`].
pub(crate) struct Completion {
    tx: Sender<JobResult>,
}

impl Completion {
    pub(crate) fn complete(self, result: JobResult) {
        // The caller may have dropped its handle
        let _ = self.tx.send(result);
    }
}

pub(crate) fn completion_pair() -> (Completion, JobHandle) {
    let (tx, rx) = mpsc::channel();
    (Completion { tx }, JobHandle { rx })
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    WorkerPool,
    Bounded,
}

/// Dedicated workers only pay off for the in-process renderer; ImageMagick
/// already parallelises each render internally.
pub fn select_strategy(config: &EngineConfig) -> Strategy {
    if config.threading.enabled && config.processing.library == ImageLibrary::Image {
        Strategy::WorkerPool
    } else {
        Strategy::Bounded
    }
}

/// Build the executor the config calls for, sized by [`effective_concurrency`].
pub fn build_executor(
    config: &EngineConfig,
    renderer: Arc<dyn Renderer>,
) -> Result<Box<dyn JobExecutor>, ExecutorError> {
    let capacity = effective_concurrency(&config.threading);
    let strategy = select_strategy(config);
    debug!(?strategy, capacity, "building executor");

    Ok(match strategy {
        Strategy::WorkerPool => Box::new(WorkerPoolExecutor::new(capacity, renderer)?),
        Strategy::Bounded => Box::new(BoundedExecutor::new(capacity, renderer)?),
    })
}
