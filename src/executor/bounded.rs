//! Slot-counting executor on a dedicated rayon pool.
//!
//! `capacity` slots guard the renderer. A submission either takes a free
//! slot, and a slot runner is spawned onto the pool, or joins the FIFO
//! backlog. A runner keeps pulling from the backlog until it is empty and only
//! then gives its slot back, so queued jobs start in submission order without
//! a separate dispatcher thread.
//!
//! Renderer panics are caught per job and reported as
//! [`ExecutorError::Panicked`]; the runner carries on with the backlog.

use super::{
    Completion, ExecutorError, JobExecutor, JobHandle, JobResult, completion_pair, panic_message,
};
use crate::imaging::{RenderJob, Renderer};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

struct Pending {
    job: RenderJob,
    done: Completion,
}

#[derive(Default)]
struct Slots {
    active: usize,
    backlog: VecDeque<Pending>,
}

struct Shared {
    capacity: usize,
    slots: Mutex<Slots>,
    renderer: Arc<dyn Renderer>,
}

pub struct BoundedExecutor {
    shared: Arc<Shared>,
    pool: rayon::ThreadPool,
}

impl BoundedExecutor {
    pub fn new(capacity: usize, renderer: Arc<dyn Renderer>) -> Result<Self, ExecutorError> {
        let capacity = capacity.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(capacity)
            .thread_name(|i| format!("render-slot-{i}"))
            .build()
            .map_err(|e| ExecutorError::Pool(e.to_string()))?;

        Ok(Self {
            shared: Arc::new(Shared {
                capacity,
                slots: Mutex::new(Slots::default()),
                renderer,
            }),
            pool,
        })
    }

    /// Jobs waiting for a slot.
    pub fn backlog_len(&self) -> usize {
        self.shared.slots.lock().backlog.len()
    }
}

impl JobExecutor for BoundedExecutor {
    fn submit(&self, job: RenderJob) -> JobHandle {
        let (done, handle) = completion_pair();
        let pending = Pending { job, done };

        let admitted = {
            let mut slots = self.shared.slots.lock();
            if slots.active < self.shared.capacity {
                slots.active += 1;
                Some(pending)
            } else {
                slots.backlog.push_back(pending);
                None
            }
        };

        if let Some(first) = admitted {
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || run_slot(&shared, first));
        }
        handle
    }

    fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

/// Run `first`, then drain the backlog. Releases the slot when nothing is left.
fn run_slot(shared: &Shared, first: Pending) {
    let mut next = Some(first);
    while let Some(Pending { job, done }) = next {
        done.complete(run_one(shared.renderer.as_ref(), &job));

        next = {
            let mut slots = shared.slots.lock();
            let queued = slots.backlog.pop_front();
            if queued.is_none() {
                slots.active -= 1;
            }
            queued
        };
    }
}

fn run_one(renderer: &dyn Renderer, job: &RenderJob) -> JobResult {
    match panic::catch_unwind(AssertUnwindSafe(|| renderer.render(job))) {
        Ok(result) => result.map_err(ExecutorError::from),
        Err(payload) => {
            let message = panic_message(&*payload);
            warn!(source = %job.source.display(), panic = %message, "renderer panicked");
            Err(ExecutorError::Panicked(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockRenderer, job};
    use std::time::Duration;
    use tempfile::TempDir;

    fn submit_many(executor: &BoundedExecutor, tmp: &TempDir, names: &[&str]) -> Vec<JobHandle> {
        names
            .iter()
            .map(|n| {
                let out = tmp.path().join(format!("{n}_240.jpg"));
                executor.submit(job(&format!("/src/{n}"), &out))
            })
            .collect()
    }

    #[test]
    fn runs_a_single_job() {
        let tmp = TempDir::new().unwrap();
        let renderer = Arc::new(MockRenderer::new());
        let executor = BoundedExecutor::new(2, renderer.clone()).unwrap();

        let handle = executor.submit(job("/src/a.jpg", &tmp.path().join("a.jpg_240.jpg")));

        handle.wait().unwrap();
        assert!(tmp.path().join("a.jpg_240.jpg").exists());
        assert_eq!(renderer.render_count(), 1);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let executor = BoundedExecutor::new(0, Arc::new(MockRenderer::new())).unwrap();
        assert_eq!(executor.capacity(), 1);
    }

    #[test]
    fn never_exceeds_capacity() {
        let tmp = TempDir::new().unwrap();
        let renderer = Arc::new(MockRenderer::with_delay(Duration::from_millis(20)));
        let executor = BoundedExecutor::new(3, renderer.clone()).unwrap();

        let names: Vec<String> = (0..6).map(|i| format!("{i}.jpg")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        for handle in submit_many(&executor, &tmp, &refs) {
            handle.wait().unwrap();
        }

        assert_eq!(renderer.render_count(), 6);
        assert!(renderer.max_active() <= 3, "max_active = {}", renderer.max_active());
        assert!(renderer.max_active() >= 1);
    }

    #[test]
    fn backlog_starts_in_submission_order() {
        let tmp = TempDir::new().unwrap();
        let renderer = Arc::new(MockRenderer::with_delay(Duration::from_millis(5)));
        let executor = BoundedExecutor::new(1, renderer.clone()).unwrap();

        let handles = submit_many(&executor, &tmp, &["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
        for handle in handles {
            handle.wait().unwrap();
        }

        let order: Vec<_> = renderer
            .recorded()
            .iter()
            .map(|j| j.source.display().to_string())
            .collect();
        assert_eq!(order, vec!["/src/a.jpg", "/src/b.jpg", "/src/c.jpg", "/src/d.jpg"]);
        assert_eq!(renderer.max_active(), 1);
        assert_eq!(executor.backlog_len(), 0);
    }

    #[test]
    fn failure_is_isolated_to_its_handle() {
        let tmp = TempDir::new().unwrap();
        let renderer =
            Arc::new(MockRenderer::new().failing_when(|j| j.source.ends_with("bad.jpg")));
        let executor = BoundedExecutor::new(2, renderer.clone()).unwrap();

        let handles = submit_many(&executor, &tmp, &["a.jpg", "bad.jpg", "c.jpg", "d.jpg"]);
        let results: Vec<_> = handles.into_iter().map(JobHandle::wait).collect();

        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ExecutorError::Render(crate::imaging::RenderError::ProcessingFailed(_)))
        ));
        assert!(results[2].is_ok());
        assert!(results[3].is_ok());
    }

    #[test]
    fn panic_is_reported_and_executor_keeps_working() {
        let tmp = TempDir::new().unwrap();
        let renderer =
            Arc::new(MockRenderer::new().panicking_when(|j| j.source.ends_with("boom.jpg")));
        let executor = BoundedExecutor::new(1, renderer.clone()).unwrap();

        let handles = submit_many(&executor, &tmp, &["boom.jpg", "after.jpg"]);
        let results: Vec<_> = handles.into_iter().map(JobHandle::wait).collect();

        match &results[0] {
            Err(ExecutorError::Panicked(msg)) => assert!(msg.contains("boom.jpg")),
            other => panic!("expected Panicked, got {other:?}"),
        }
        assert!(results[1].is_ok());
        assert!(tmp.path().join("after.jpg_240.jpg").exists());
    }
}
