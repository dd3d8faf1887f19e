//! Long-lived worker threads pulling from a shared FIFO queue.
//!
//! Workers do not catch renderer panics. A panic unwinds the worker thread;
//! on the way out, the in-flight guard spawns a replacement worker and then
//! resolves the job's handle with [`ExecutorError::WorkerCrashed`], so
//! capacity is restored before the caller sees the failure.
//!
//! If a replacement cannot be spawned the pool shrinks. Once no worker is
//! left, queued jobs and new submissions resolve with
//! [`ExecutorError::WorkerUnavailable`] instead of waiting forever.
//!
//! Dropping the executor asks workers to exit once the queue is empty.

use super::{Completion, ExecutorError, JobExecutor, JobHandle, completion_pair};
use crate::imaging::{RenderJob, Renderer};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, error, warn};

struct Envelope {
    job: RenderJob,
    done: Completion,
}

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Envelope>,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
    renderer: Arc<dyn Renderer>,
    live: AtomicUsize,
    next_id: AtomicUsize,
    #[cfg(test)]
    refuse_respawn: std::sync::atomic::AtomicBool,
}

pub struct WorkerPoolExecutor {
    shared: Arc<Shared>,
    capacity: usize,
}

impl WorkerPoolExecutor {
    pub fn new(capacity: usize, renderer: Arc<dyn Renderer>) -> Result<Self, ExecutorError> {
        let capacity = capacity.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            available: Condvar::new(),
            renderer,
            live: AtomicUsize::new(0),
            next_id: AtomicUsize::new(0),
            #[cfg(test)]
            refuse_respawn: std::sync::atomic::AtomicBool::new(false),
        });

        let executor = Self { shared, capacity };
        for _ in 0..capacity {
            // On error, dropping `executor` shuts down the workers already started
            spawn_worker(&executor.shared)
                .map_err(|e| ExecutorError::Pool(format!("cannot spawn render worker: {e}")))?;
        }
        debug!(capacity, "render workers started");
        Ok(executor)
    }

    /// Worker threads currently alive.
    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }
}

impl JobExecutor for WorkerPoolExecutor {
    fn submit(&self, job: RenderJob) -> JobHandle {
        let mut queue = self.shared.queue.lock();
        if self.shared.live.load(Ordering::SeqCst) == 0 {
            return JobHandle::resolved(Err(ExecutorError::WorkerUnavailable));
        }

        let (done, handle) = completion_pair();
        queue.jobs.push_back(Envelope { job, done });
        drop(queue);
        self.shared.available.notify_one();
        handle
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for WorkerPoolExecutor {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.available.notify_all();
    }
}

/// Start one worker. Counts it as live before the thread exists so callers
/// never observe a transient dip.
fn spawn_worker(shared: &Arc<Shared>) -> io::Result<()> {
    if respawn_refused(shared) {
        return Err(io::Error::other("respawn refused"));
    }

    let id = shared.next_id.fetch_add(1, Ordering::SeqCst);
    shared.live.fetch_add(1, Ordering::SeqCst);
    let worker_shared = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name(format!("render-worker-{id}"))
        .spawn(move || worker_loop(worker_shared));

    if let Err(e) = spawned {
        shared.live.fetch_sub(1, Ordering::SeqCst);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
fn respawn_refused(shared: &Shared) -> bool {
    shared.refuse_respawn.load(Ordering::SeqCst)
}

#[cfg(not(test))]
fn respawn_refused(_shared: &Shared) -> bool {
    false
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let envelope = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(envelope) = queue.jobs.pop_front() {
                    break Some(envelope);
                }
                if queue.shutdown {
                    break None;
                }
                shared.available.wait(&mut queue);
            }
        };

        let Some(Envelope { job, done }) = envelope else {
            shared.live.fetch_sub(1, Ordering::SeqCst);
            return;
        };

        let guard = InFlight {
            shared: &shared,
            done: Some(done),
            source: job.source.clone(),
        };
        let result = shared.renderer.render(&job).map_err(ExecutorError::from);
        guard.finish(result);
    }
}

/// Owns the completion of the job a worker is rendering.
///
/// If the worker unwinds, `Drop` replaces the worker and reports the crash.
struct InFlight<'a> {
    shared: &'a Arc<Shared>,
    done: Option<Completion>,
    source: PathBuf,
}

impl InFlight<'_> {
    fn finish(mut self, result: Result<(), ExecutorError>) {
        if let Some(done) = self.done.take() {
            done.complete(result);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let Some(done) = self.done.take() else {
            return;
        };

        let worker = thread::current().name().unwrap_or("render-worker").to_string();
        warn!(%worker, source = %self.source.display(), "render worker crashed");

        self.shared.live.fetch_sub(1, Ordering::SeqCst);
        let shutting_down = self.shared.queue.lock().shutdown;
        if !shutting_down {
            if let Err(e) = spawn_worker(self.shared) {
                error!(error = %e, "cannot replace crashed render worker");
                fail_queue_if_no_workers(self.shared);
            }
        }

        done.complete(Err(ExecutorError::WorkerCrashed(format!(
            "{} panicked while rendering {}",
            worker,
            self.source.display()
        ))));
    }
}

/// With no live worker, nothing will ever pop the queue: fail what is there.
fn fail_queue_if_no_workers(shared: &Shared) {
    let drained: Vec<Envelope> = {
        let mut queue = shared.queue.lock();
        if shared.live.load(Ordering::SeqCst) > 0 {
            return;
        }
        queue.jobs.drain(..).collect()
    };
    for envelope in drained {
        envelope.done.complete(Err(ExecutorError::WorkerUnavailable));
    }
}
