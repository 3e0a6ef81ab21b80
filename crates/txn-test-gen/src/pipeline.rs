//! Hands batches to the backend and folds the results into statistics.

use crate::batch::Batch;
use crate::chain::{HostExecutor, TransactionSink};
use crate::error::SubmissionError;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error};
use txn_test_gen_types::{PackedTransaction, TransactionId, TransactionTrace};

/// Throughput counters of the running session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// CPU time billed to accepted transactions.
    pub accumulated_billed_time_us: u64,
    pub accepted_count: u64,
    pub rejected_count: u64,
}

#[derive(Debug, Default)]
struct StatisticsState {
    session: Option<u64>,
    stats: Statistics,
}

/// Statistics guarded by the id of the session they belong to.
///
/// Completions can arrive after the session that submitted them has been
/// stopped. They carry the id of their session and are dropped unless it is
/// still the current one.
#[derive(Debug, Default)]
pub struct StatisticsCell {
    state: Mutex<StatisticsState>,
}

impl StatisticsCell {
    /// Zeroes the counters and starts accepting results for `session`.
    pub fn begin(&self, session: u64) {
        let mut state = self.lock();
        state.session = Some(session);
        state.stats = Statistics::default();
    }

    /// Folds a completion into the counters. Returns false if the result
    /// belongs to a session that is no longer current.
    pub fn record(&self, session: u64, trace: &TransactionTrace) -> bool {
        let mut state = self.lock();
        if state.session != Some(session) {
            return false;
        }
        match trace.receipt {
            Some(receipt) => {
                state.stats.accumulated_billed_time_us += u64::from(receipt.cpu_usage_us);
                state.stats.accepted_count += 1;
            }
            None => state.stats.rejected_count += 1,
        }
        true
    }

    pub fn snapshot(&self) -> Statistics {
        self.lock().stats
    }

    /// Ends the current session, returning its final counters and resetting
    /// them to zero.
    pub fn finish(&self) -> Statistics {
        let mut state = self.lock();
        state.session = None;
        std::mem::take(&mut state.stats)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatisticsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Submits transactions on the host runtime without waiting for them.
#[derive(Clone)]
pub struct SubmissionPipeline {
    sink: Arc<dyn TransactionSink>,
    host: HostExecutor,
    statistics: Arc<StatisticsCell>,
}

impl SubmissionPipeline {
    pub fn new(
        sink: Arc<dyn TransactionSink>,
        host: HostExecutor,
        statistics: Arc<StatisticsCell>,
    ) -> Self {
        Self {
            sink,
            host,
            statistics,
        }
    }

    pub fn statistics(&self) -> &Arc<StatisticsCell> {
        &self.statistics
    }

    pub fn host(&self) -> &HostExecutor {
        &self.host
    }

    /// Posts `batch` to the backend and returns immediately.
    ///
    /// Every transaction is accepted concurrently and results are folded in
    /// whatever order they complete. The first backend failure is passed to
    /// `on_fatal`; later ones are only logged.
    pub fn submit<F>(&self, session: u64, batch: Batch, on_fatal: F) -> JoinHandle<()>
    where
        F: FnOnce(SubmissionError) + Send + 'static,
    {
        let sink = self.sink.clone();
        let statistics = self.statistics.clone();
        self.host.post_low(async move {
            let mut on_fatal = Some(on_fatal);
            let mut pending = accept_each(&sink, batch.into_transactions());
            while let Some((id, result)) = pending.next().await {
                match result {
                    Ok(trace) => {
                        if let Some(except) = &trace.except {
                            debug!(txn_id = %id, reason = %except, "Transaction rejected");
                        }
                        if !statistics.record(session, &trace) {
                            debug!(txn_id = %id, session, "Dropping completion of stopped session");
                        }
                    }
                    Err(err) => {
                        error!(txn_id = %id, session, error = %err, "Transaction submission failed");
                        if let Some(on_fatal) = on_fatal.take() {
                            on_fatal(err);
                        }
                    }
                }
            }
        })
    }

    /// Accepts `transactions` one after another, stopping at the first
    /// backend failure or rejected transaction. Later transactions are not
    /// sent. Statistics are not touched.
    pub async fn accept_in_order(
        &self,
        transactions: Vec<PackedTransaction>,
    ) -> Result<Vec<TransactionTrace>, SubmissionError> {
        let sink = self.sink.clone();
        let task = self.host.post_low(async move {
            let mut traces = Vec::with_capacity(transactions.len());
            for transaction in transactions {
                let trace = sink.accept(transaction).await?;
                if !trace.is_accepted() {
                    return Err(SubmissionError::Failed {
                        id: trace.id,
                        message: trace.except.unwrap_or_else(|| "rejected".to_string()),
                    });
                }
                traces.push(trace);
            }
            Ok::<_, SubmissionError>(traces)
        });
        task.await
            .map_err(|e| SubmissionError::Unavailable(format!("submission task failed: {e}")))?
    }
}

type Completion = (TransactionId, Result<TransactionTrace, SubmissionError>);

fn accept_each(
    sink: &Arc<dyn TransactionSink>,
    transactions: Vec<PackedTransaction>,
) -> FuturesUnordered<impl std::future::Future<Output = Completion>> {
    transactions
        .into_iter()
        .map(|transaction| {
            let sink = sink.clone();
            async move {
                let id = transaction.id();
                (id, sink.accept(transaction).await)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use txn_test_gen_types::{Checksum256, TransactionReceipt, TransactionStatus};

    fn receipt(cpu_usage_us: u32) -> TransactionReceipt {
        TransactionReceipt {
            status: TransactionStatus::Executed,
            cpu_usage_us,
            net_usage_words: 0,
        }
    }

    #[test]
    fn test_statistics_ignore_stale_sessions() {
        let cell = StatisticsCell::default();
        cell.begin(1);
        assert!(cell.record(1, &TransactionTrace::accepted(Checksum256::ZERO, receipt(100))));
        assert!(cell.record(1, &TransactionTrace::rejected(Checksum256::ZERO, "dup")));
        assert!(!cell.record(2, &TransactionTrace::accepted(Checksum256::ZERO, receipt(5))));

        let stats = cell.snapshot();
        assert_eq!(stats.accumulated_billed_time_us, 100);
        assert_eq!(stats.accepted_count, 1);
        assert_eq!(stats.rejected_count, 1);

        assert_eq!(cell.finish(), stats);
        assert_eq!(cell.snapshot(), Statistics::default());
        assert!(!cell.record(1, &TransactionTrace::accepted(Checksum256::ZERO, receipt(100))));
        assert_eq!(cell.snapshot(), Statistics::default());
    }

    /// Accepts every other transaction and fails the rest.
    struct FlakySink {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TransactionSink for FlakySink {
        async fn accept(
            &self,
            transaction: PackedTransaction,
        ) -> Result<TransactionTrace, SubmissionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if call % 2 == 0 {
                Ok(TransactionTrace::accepted(transaction.id(), receipt(10)))
            } else {
                Err(SubmissionError::Failed {
                    id: transaction.id(),
                    message: "boom".to_string(),
                })
            }
        }
    }

    fn batch(size: u64) -> Batch {
        let templates = crate::template::TransferTemplates::new("pipeline").unwrap();
        let nonces = crate::nonce::NonceGenerator::starting_at(0);
        let context = crate::batch::BatchContext {
            reference_block: txn_test_gen_types::BlockId::default(),
            chain_id: Checksum256::ZERO,
            expiration: txn_test_gen_types::TimePointSec::from_secs(30),
        };
        crate::batch::build_batch(size, &templates, &nonces, 0, &context).unwrap()
    }

    #[tokio::test]
    async fn test_submit_reports_first_fatal_error_once() {
        let statistics = Arc::new(StatisticsCell::default());
        statistics.begin(7);
        let pipeline = SubmissionPipeline::new(
            Arc::new(FlakySink {
                calls: AtomicUsize::new(0),
            }),
            HostExecutor::current(),
            statistics.clone(),
        );

        let fatal_calls = Arc::new(AtomicUsize::new(0));
        let counter = fatal_calls.clone();
        pipeline
            .submit(7, batch(2), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(fatal_calls.load(Ordering::SeqCst), 1);
        let stats = statistics.snapshot();
        assert_eq!(stats.accepted_count, 2);
        assert_eq!(stats.accumulated_billed_time_us, 20);
    }

    #[tokio::test]
    async fn test_accept_in_order_stops_at_first_error() {
        let sink = Arc::new(FlakySink {
            calls: AtomicUsize::new(0),
        });
        let pipeline = SubmissionPipeline::new(
            sink.clone(),
            HostExecutor::current(),
            Arc::new(StatisticsCell::default()),
        );
        let err = pipeline
            .accept_in_order(batch(2).into_transactions())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Failed { .. }));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert_eq!(pipeline.statistics().snapshot(), Statistics::default());
    }

    /// Accepts every other transaction and rejects the rest.
    struct PickySink {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TransactionSink for PickySink {
        async fn accept(
            &self,
            transaction: PackedTransaction,
        ) -> Result<TransactionTrace, SubmissionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 2 == 0 {
                Ok(TransactionTrace::accepted(transaction.id(), receipt(10)))
            } else {
                Ok(TransactionTrace::rejected(transaction.id(), "expired transaction"))
            }
        }
    }

    #[tokio::test]
    async fn test_submit_counts_rejects_without_failing() {
        let statistics = Arc::new(StatisticsCell::default());
        statistics.begin(3);
        let pipeline = SubmissionPipeline::new(
            Arc::new(PickySink {
                calls: AtomicUsize::new(0),
            }),
            HostExecutor::current(),
            statistics.clone(),
        );

        let fatal_calls = Arc::new(AtomicUsize::new(0));
        let counter = fatal_calls.clone();
        pipeline
            .submit(3, batch(3), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(fatal_calls.load(Ordering::SeqCst), 0);
        let stats = statistics.snapshot();
        assert_eq!(stats.accepted_count, 3);
        assert_eq!(stats.rejected_count, 3);
        assert_eq!(stats.accumulated_billed_time_us, 30);
    }

    #[tokio::test]
    async fn test_accept_in_order_stops_at_first_reject() {
        let sink = Arc::new(PickySink {
            calls: AtomicUsize::new(1),
        });
        let pipeline = SubmissionPipeline::new(
            sink.clone(),
            HostExecutor::current(),
            Arc::new(StatisticsCell::default()),
        );
        let transactions = batch(2).into_transactions();
        let first = transactions[0].id();
        let err = pipeline.accept_in_order(transactions).await.unwrap_err();
        assert_eq!(
            err,
            SubmissionError::Failed {
                id: first,
                message: "expired transaction".to_string(),
            }
        );
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }
}
