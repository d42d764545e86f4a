//! Bounded Decode Pool
//!
//! Caps how many per-cue jobs (and therefore decoder subprocesses) run at
//! once. Jobs are spawned onto a caller-owned `JoinSet`, so the caller
//! collects results in completion order and dropping the set aborts
//! everything still in flight.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Upper bound accepted for an explicit concurrency request
pub const MAX_CONCURRENT_DECODES: usize = 64;

/// Resolves a configured limit; `0` means one job per CPU core.
pub fn resolve_concurrency(requested: usize) -> usize {
    match requested {
        0 => num_cpus::get().max(1),
        n => n.min(MAX_CONCURRENT_DECODES),
    }
}

#[derive(Debug, Clone)]
pub struct DecodePool {
    semaphore: Arc<Semaphore>,
    limit: usize,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl DecodePool {
    /// Creates a pool; `max_concurrent` goes through [`resolve_concurrency`]
    pub fn new(max_concurrent: usize) -> Self {
        let limit = resolve_concurrency(max_concurrent);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Highest number of jobs observed running at the same time
    pub fn peak_concurrent(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Spawns `job` onto `tasks`; it starts once a permit is free.
    pub fn spawn<T, F>(&self, tasks: &mut JoinSet<T>, job: F)
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let running = self.running.clone();
        let peak = self.peak.clone();

        tasks.spawn(async move {
            // The semaphore is never closed, so acquisition only fails if
            // the pool itself is gone; run unthrottled in that case.
            let _permit = semaphore.acquire_owned().await.ok();

            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);

            let output = job.await;

            running.fetch_sub(1, Ordering::SeqCst);
            output
        });
    }
}
