//! A dedicated runtime that drives the scheduler.
//!
//! The pool keeps timing work off the host runtime: however busy the host
//! is building and submitting batches, ticks keep firing on time. Nothing
//! but the ticker runs here; tick work is posted back to the host.

use crate::error::{TxnTestGenError, TxnTestGenResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info};

/// Name given to every pool thread.
pub const THREAD_NAME: &str = "txn-test-gen";

/// A fixed-size multi-thread runtime with an explicit join on stop.
#[derive(Debug)]
pub struct WorkerPool {
    runtime: Option<Runtime>,
    live_threads: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Starts `threads` worker threads. `live_threads` tracks how many of
    /// them are running and may be shared across pools.
    ///
    /// # Errors
    ///
    /// Returns [`TxnTestGenError::WorkerPool`] if `threads` is zero or the
    /// runtime cannot be built.
    pub fn start(threads: usize, live_threads: Arc<AtomicUsize>) -> TxnTestGenResult<Self> {
        if threads == 0 {
            return Err(TxnTestGenError::WorkerPool(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let on_start = live_threads.clone();
        let on_stop = live_threads.clone();
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name(THREAD_NAME)
            .enable_time()
            .on_thread_start(move || {
                on_start.fetch_add(1, Ordering::SeqCst);
            })
            .on_thread_stop(move || {
                on_stop.fetch_sub(1, Ordering::SeqCst);
            })
            .build()
            .map_err(|e| TxnTestGenError::WorkerPool(e.to_string()))?;

        info!(threads, "Started worker pool");
        Ok(Self {
            runtime: Some(runtime),
            live_threads,
        })
    }

    /// Handle for spawning onto the pool, or `None` once stopped.
    pub fn handle(&self) -> Option<&Handle> {
        self.runtime.as_ref().map(Runtime::handle)
    }

    /// Number of pool threads currently alive.
    pub fn live_threads(&self) -> usize {
        self.live_threads.load(Ordering::SeqCst)
    }

    /// Shuts the runtime down and joins every pool thread. Tasks still on the
    /// pool are dropped. Stopping twice is a no-op.
    ///
    /// The join happens on the blocking pool of the calling runtime, so this
    /// must not be awaited from the pool itself.
    pub async fn stop(&mut self) -> TxnTestGenResult<()> {
        let Some(runtime) = self.runtime.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || drop(runtime))
            .await
            .map_err(|e| TxnTestGenError::WorkerPool(format!("failed to join pool: {e}")))?;
        debug!(live_threads = self.live_threads(), "Stopped worker pool");
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Blocking in drop could stall an executor thread.
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for_threads(pool: &WorkerPool, expected: usize) {
        for _ in 0..100 {
            if pool.live_threads() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {expected} live threads, got {}", pool.live_threads());
    }

    #[tokio::test]
    async fn test_start_and_stop_joins_threads() {
        let live = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::start(3, live.clone()).unwrap();
        wait_for_threads(&pool, 3).await;

        let handle = pool.handle().unwrap().clone();
        let name = handle
            .spawn(async { std::thread::current().name().map(str::to_string) })
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some(THREAD_NAME));

        pool.stop().await.unwrap();
        assert_eq!(pool.live_threads(), 0);
        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert!(pool.handle().is_none());
        pool.stop().await.unwrap();
    }

    #[test]
    fn test_zero_threads_is_rejected() {
        let err = WorkerPool::start(0, Arc::new(AtomicUsize::new(0))).unwrap_err();
        assert!(matches!(err, TxnTestGenError::WorkerPool(_)));
    }

    #[tokio::test]
    async fn test_drop_inside_runtime_does_not_panic() {
        let pool = WorkerPool::start(1, Arc::new(AtomicUsize::new(0))).unwrap();
        drop(pool);
    }
}
