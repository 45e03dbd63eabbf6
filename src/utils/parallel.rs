use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

/// Shared stop request. Setting it stops new work from being scheduled;
/// work already started runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub trait ParallelProcessor {
    /// Dedicated pool bounded to `jobs` workers, so catalog requests and disk
    /// writes stay within the configured concurrency.
    fn build_pool(jobs: usize) -> std::io::Result<rayon::ThreadPool> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .thread_name(|i| format!("dvtag-worker-{i}"))
            .build()
            .map_err(std::io::Error::other)?;
        debug!("Using {} worker threads", pool.current_num_threads());
        Ok(pool)
    }

    fn get_progress_counter() -> AtomicUsize {
        AtomicUsize::new(0)
    }

    /// Runs `f` over `items` on `pool`, skipping items once `cancel` is set.
    /// Results keep input order; skipped items yield `on_cancel`.
    fn process_cancellable<T, R, F, C>(
        pool: &rayon::ThreadPool,
        items: &[T],
        cancel: &CancellationFlag,
        f: F,
        on_cancel: C,
    ) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
        C: Fn(&T) -> R + Send + Sync,
    {
        let progress = Self::get_progress_counter();
        let total = items.len();

        pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    if cancel.is_cancelled() {
                        return on_cancel(item);
                    }
                    let result = f(item);
                    let done = progress.fetch_add(1, Ordering::SeqCst) + 1;
                    if done % 10 == 0 || done == total {
                        info!("Progress: {}/{} folders", done, total);
                    }
                    result
                })
                .collect()
        })
    }
}
