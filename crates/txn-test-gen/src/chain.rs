//! The generator's view of the backend it loads.
//!
//! A backend is anything that can answer questions about the head of the
//! chain ([`ChainState`]) and take transactions ([`TransactionSink`]). The
//! [`HostExecutor`] is the runtime the backend lives on; everything that
//! touches the backend runs there, never on the generator's own pool.

use crate::error::SubmissionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use txn_test_gen_types::{BlockId, ChainId, PackedTransaction, TimePointSec, TransactionTrace};

/// Counters a backend keeps about the blocks it produces. Reset at the start
/// of each generation session and read when it stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDiagnostics {
    pub blocks: u64,
    pub txns: u64,
    pub accepted_txns: u64,
    pub rejected_txns: u64,
    /// Total time spent applying transactions.
    pub process_transaction_us: u64,
    /// Total time spent recovering signatures.
    pub sig_transaction_us: u64,
}

/// Read access to chain head state.
pub trait ChainState: Send + Sync + 'static {
    fn chain_id(&self) -> ChainId;

    fn head_block_num(&self) -> u32;

    fn head_block_id(&self) -> BlockId;

    fn head_block_time(&self) -> TimePointSec;

    fn last_irreversible_block_num(&self) -> u32;

    /// Looks up the id of a block on the current chain.
    fn block_id_for_num(&self, block_num: u32) -> Option<BlockId>;

    fn reset_diagnostics(&self);

    fn diagnostics(&self) -> ChainDiagnostics;
}

/// Structs that implement this trait accept transactions on behalf of the
/// backend.
///
/// `Ok` covers both outcomes of normal validation: a trace with a receipt for
/// an accepted transaction, and one without for a rejected one. `Err` means
/// the backend itself failed.
#[async_trait]
pub trait TransactionSink: Send + Sync + 'static {
    async fn accept(
        &self,
        transaction: PackedTransaction,
    ) -> Result<TransactionTrace, SubmissionError>;
}

/// Posts work onto the host runtime at low priority.
#[derive(Clone, Debug)]
pub struct HostExecutor {
    handle: Handle,
    tracker: TaskTracker,
}

impl HostExecutor {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tracker: TaskTracker::new(),
        }
    }

    /// Wraps the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns `fut` on the host runtime. The task yields once before running
    /// so that work already queued on the host goes first.
    pub fn post_low<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn_on(
            async move {
                tokio::task::yield_now().await;
                fut.await
            },
            &self.handle,
        )
    }

    /// Number of posted tasks that have not finished.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every task posted so far, and any they post in turn, has
    /// finished.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_post_low_runs_on_host() {
        let host = HostExecutor::current();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = counter.clone();
            host.post_low(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        host.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(host.pending(), 0);
    }

    #[tokio::test]
    async fn test_post_low_returns_output() {
        let host = HostExecutor::current();
        let value = host.post_low(async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }
}
