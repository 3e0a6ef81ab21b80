//! The load generator and its session lifecycle.
//!
//! A [`TxnTestGen`] is either idle or running one generation session. While
//! running, a [`Scheduler`] on the generator's own [`WorkerPool`] fires every
//! `period_ms`; each tick posts work to the host runtime that builds a batch
//! of `batch_size` signed transfers and hands it to the
//! [`SubmissionPipeline`]. Stopping cancels the scheduler, joins the pool and
//! reports a [`GenerationSummary`].
//!
//! Sessions are numbered. Completions that arrive after their session has
//! stopped, including a failure that would otherwise trigger an emergency
//! stop, are recognised by their stale session id and ignored.
//!
//! # Examples
//!
//! ```no_run
//! use anyhow::Result;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use txn_test_gen::{SimulatedChain, TxnTestGenBuilder};
//!
//! async fn example() -> Result<()> {
//!     let chain = Arc::new(SimulatedChain::new());
//!     let generator = TxnTestGenBuilder::from_backend(chain).build()?;
//!
//!     generator.start_generation("salt", 20, 10).await?;
//!     tokio::time::sleep(Duration::from_secs(1)).await;
//!     let summary = generator.stop_generation().await?;
//!     println!("{} TPS", summary.tps);
//!     Ok(())
//! }
//! ```

use crate::batch::{build_batch, BatchContext};
use crate::chain::{ChainState, HostExecutor, TransactionSink};
use crate::config::TxnTestGenConfig;
use crate::error::{SubmissionError, TxnTestGenError, TxnTestGenResult};
use crate::nonce::NonceGenerator;
use crate::pipeline::{Statistics, StatisticsCell, SubmissionPipeline};
use crate::scheduler::Scheduler;
use crate::summary::GenerationSummary;
use crate::template::TransferTemplates;
use crate::worker_pool::WorkerPool;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Largest accepted `period_ms`.
pub const MAX_PERIOD_MS: u64 = 2500;
/// Largest accepted `batch_size`.
pub const MAX_BATCH_SIZE: u64 = 250;

/// Session id meaning "no session".
const NO_SESSION: u64 = 0;

/// See the module level comments.
pub struct TxnTestGenBuilder {
    chain: Arc<dyn ChainState>,
    sink: Arc<dyn TransactionSink>,
    config: TxnTestGenConfig,
    host: Option<HostExecutor>,
    nonces: Option<NonceGenerator>,
}

impl TxnTestGenBuilder {
    /// Create a new builder from the two halves of a backend.
    ///
    /// # Parameters
    /// * `chain` - Source of head block state and diagnostics
    /// * `sink` - Where generated transactions are submitted
    pub fn new(chain: Arc<dyn ChainState>, sink: Arc<dyn TransactionSink>) -> Self {
        Self {
            chain,
            sink,
            config: TxnTestGenConfig::default(),
            host: None,
            nonces: None,
        }
    }

    /// Create a new builder from a backend implementing both traits.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ChainState + TransactionSink,
    {
        Self::new(backend.clone(), backend)
    }

    /// Set the generator configuration.
    pub fn with_config(mut self, config: TxnTestGenConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the host runtime. Defaults to the runtime `build` is called on.
    pub fn with_host(mut self, host: HostExecutor) -> Self {
        self.host = Some(host);
        self
    }

    /// Set the nonce source. Defaults to the process-wide counter.
    pub fn with_nonce_generator(mut self, nonces: NonceGenerator) -> Self {
        self.nonces = Some(nonces);
        self
    }

    /// Build the generator.
    ///
    /// # Errors
    ///
    /// Returns [`TxnTestGenError::Config`] if the configuration is invalid or
    /// no host was given and the caller is not inside a tokio runtime.
    pub fn build(self) -> TxnTestGenResult<TxnTestGen> {
        self.config.validate()?;
        let host = match self.host {
            Some(host) => host,
            None => HostExecutor::new(Handle::try_current().map_err(|e| {
                TxnTestGenError::Config(format!("no host runtime available: {e}"))
            })?),
        };
        let statistics = Arc::new(StatisticsCell::default());
        let pipeline = SubmissionPipeline::new(self.sink, host, statistics);
        Ok(TxnTestGen {
            inner: Arc::new(Inner {
                config: self.config,
                chain: self.chain,
                pipeline,
                nonces: self.nonces.unwrap_or_default(),
                session: Mutex::new(None),
                current_session: AtomicU64::new(NO_SESSION),
                next_session_id: AtomicU64::new(NO_SESSION + 1),
                live_threads: Arc::new(AtomicUsize::new(0)),
            }),
        })
    }
}

struct Session {
    id: u64,
    scheduler: Scheduler,
    pool: WorkerPool,
    started_at: Instant,
}

pub(crate) struct Inner {
    pub(crate) config: TxnTestGenConfig,
    pub(crate) chain: Arc<dyn ChainState>,
    pub(crate) pipeline: SubmissionPipeline,
    nonces: NonceGenerator,
    /// Serializes start and stop.
    session: Mutex<Option<Session>>,
    /// Id of the session ticks should still work for.
    current_session: AtomicU64,
    next_session_id: AtomicU64,
    live_threads: Arc<AtomicUsize>,
}

/// See the module level comments.
#[derive(Clone)]
pub struct TxnTestGen {
    pub(crate) inner: Arc<Inner>,
}

impl TxnTestGen {
    /// Starts generating `batch_size` transfers every `period_ms`
    /// milliseconds, with `salt` as the transfer memo.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-operation error, leaving the generator
    /// untouched, if a session is already running, `period_ms` is not in
    /// `1..=2500`, or `batch_size` is not an even number in `1..=250`.
    pub async fn start_generation(
        &self,
        salt: &str,
        period_ms: u64,
        batch_size: u64,
    ) -> TxnTestGenResult<()> {
        let mut session = self.inner.session.lock().await;
        if session
            .as_ref()
            .is_some_and(|running| !self.inner.is_abandoned(running))
        {
            return Err(TxnTestGenError::lifecycle(
                "Transaction test generator already running",
            ));
        }
        if !(1..=MAX_PERIOD_MS).contains(&period_ms) {
            return Err(TxnTestGenError::validation(format!(
                "period_ms must be in 1..={MAX_PERIOD_MS}, got {period_ms}"
            )));
        }
        if !(1..=MAX_BATCH_SIZE).contains(&batch_size) {
            return Err(TxnTestGenError::validation(format!(
                "batch_size must be in 1..={MAX_BATCH_SIZE}, got {batch_size}"
            )));
        }
        if batch_size % 2 != 0 {
            return Err(TxnTestGenError::validation(format!(
                "batch_size must be even, got {batch_size}"
            )));
        }

        let templates = Arc::new(TransferTemplates::new(salt)?);
        // An emergency stop may not have finished tearing down yet.
        if let Some(abandoned) = session.take() {
            self.teardown(abandoned).await;
        }
        let threads = usize::from(self.inner.config.threads);
        let pool = WorkerPool::start(threads, self.inner.live_threads.clone())?;
        let pool_handle = pool
            .handle()
            .cloned()
            .ok_or_else(|| TxnTestGenError::WorkerPool("pool stopped while starting".into()))?;

        let id = self.inner.next_session_id.fetch_add(1, Ordering::SeqCst);
        self.inner.chain.reset_diagnostics();
        self.inner.pipeline.statistics().begin(id);
        self.inner.current_session.store(id, Ordering::SeqCst);

        let tick = TickContext {
            inner: Arc::downgrade(&self.inner),
            session: id,
            half_batch: batch_size / 2,
            templates,
        };
        let scheduler = Scheduler::arm(
            &pool_handle,
            Duration::from_millis(period_ms),
            tokio::time::Instant::now(),
            move |prefix| tick.fire(prefix),
        );

        info!(
            session = id,
            batch_size,
            period_ms,
            threads,
            "Started transaction test generation"
        );
        *session = Some(Session {
            id,
            scheduler,
            pool,
            started_at: Instant::now(),
        });
        Ok(())
    }

    /// Stops the running session and reports what it achieved. Statistics
    /// are reset.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-operation error if no session is running.
    pub async fn stop_generation(&self) -> TxnTestGenResult<GenerationSummary> {
        self.stop_session(None).await
    }

    /// Stops the running session if it is `expected`, or whichever session is
    /// running if `expected` is `None`.
    async fn stop_session(&self, expected: Option<u64>) -> TxnTestGenResult<GenerationSummary> {
        let mut guard = self.inner.session.lock().await;
        let session = match guard.take() {
            None => {
                return Err(TxnTestGenError::lifecycle(
                    "Transaction test generator not running",
                ))
            }
            Some(session) if expected.is_some_and(|id| id != session.id) => {
                *guard = Some(session);
                return Err(TxnTestGenError::lifecycle("Session already stopped"));
            }
            Some(session) if expected.is_none() && self.inner.is_abandoned(&session) => {
                self.teardown(session).await;
                return Err(TxnTestGenError::lifecycle(
                    "Transaction test generator not running",
                ));
            }
            Some(session) => session,
        };
        Ok(self.teardown(session).await)
    }

    /// Cancels the scheduler, joins the pool and folds up the statistics of
    /// `session`. Callers hold the session lock.
    async fn teardown(&self, session: Session) -> GenerationSummary {
        let Session {
            id,
            scheduler,
            mut pool,
            started_at,
        } = session;
        // Only clear the marker if it is still ours.
        let _ = self.inner.current_session.compare_exchange(
            id,
            NO_SESSION,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );

        info!(session = id, "Stopping transaction test generation");
        let ticks = scheduler.stop().await;
        if let Err(e) = pool.stop().await {
            warn!(session = id, error = %e, "Worker pool did not stop cleanly");
        }

        let statistics = self.inner.pipeline.statistics().finish();
        let diagnostics = self.inner.chain.diagnostics();
        let summary = GenerationSummary::compute(started_at.elapsed(), statistics, diagnostics);
        debug!(session = id, ticks, "Session stopped");
        summary.log();
        summary
    }

    /// Host shutdown hook: stops a running session, and succeeds quietly if
    /// there is none. Waits for submissions already in flight.
    pub async fn shutdown(&self) -> TxnTestGenResult<()> {
        match self.stop_generation().await {
            Ok(_) => {}
            Err(e) if e.is_invalid_operation() => {}
            Err(e) => return Err(e),
        }
        self.wait_for_submissions().await;
        Ok(())
    }

    /// Whether a session is running.
    pub fn is_running(&self) -> bool {
        self.inner.current_session.load(Ordering::SeqCst) != NO_SESSION
    }

    /// Counters of the running session, or zero when idle.
    pub fn statistics(&self) -> Statistics {
        self.inner.pipeline.statistics().snapshot()
    }

    /// Number of worker pool threads alive.
    pub fn live_worker_threads(&self) -> usize {
        self.inner.live_threads.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &TxnTestGenConfig {
        &self.inner.config
    }

    /// Waits until every tick and submission posted to the host so far has
    /// completed.
    pub async fn wait_for_submissions(&self) {
        self.inner.pipeline.host().drain().await;
    }
}

/// What a tick needs to find its way back to the generator.
struct TickContext {
    inner: Weak<Inner>,
    session: u64,
    half_batch: u64,
    templates: Arc<TransferTemplates>,
}

impl TickContext {
    /// Runs on the worker pool. Posts the tick's work to the host and tells
    /// the scheduler whether to keep going.
    fn fire(&self, prefix: u64) -> ControlFlow<()> {
        let Some(inner) = self.inner.upgrade() else {
            return ControlFlow::Break(());
        };
        if inner.current_session.load(Ordering::SeqCst) != self.session {
            return ControlFlow::Break(());
        }
        let session = self.session;
        let half_batch = self.half_batch;
        let templates = self.templates.clone();
        let host = inner.pipeline.host().clone();
        host.post_low(async move {
            inner.send_batch(session, prefix, half_batch, &templates);
        });
        ControlFlow::Continue(())
    }
}

impl Inner {
    /// True once an emergency stop has claimed `session` but its teardown
    /// has not run yet.
    fn is_abandoned(&self, session: &Session) -> bool {
        self.current_session.load(Ordering::SeqCst) != session.id
    }

    /// Builds one batch and submits it. Build failures are logged and the
    /// tick is skipped.
    fn send_batch(
        self: &Arc<Self>,
        session: u64,
        prefix: u64,
        half_batch: u64,
        templates: &TransferTemplates,
    ) {
        if self.current_session.load(Ordering::SeqCst) != session {
            return;
        }
        let lag = self.config.reference_block_lag;
        let batch = BatchContext::from_chain(self.chain.as_ref(), lag).and_then(|context| {
            build_batch(half_batch, templates, &self.nonces, prefix, &context)
        });
        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                error!(session, prefix, error = %e, "Failed to build transaction batch");
                return;
            }
        };

        let generator = Arc::downgrade(self);
        self.pipeline.submit(session, batch, move |err| {
            if let Some(inner) = generator.upgrade() {
                inner.emergency_stop(session, err);
            }
        });
    }

    /// Tears down `session` after a backend failure, unless it has already
    /// been stopped.
    fn emergency_stop(self: Arc<Self>, session: u64, err: SubmissionError) {
        if self
            .current_session
            .compare_exchange(session, NO_SESSION, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(session, error = %err, "Ignoring failure of stopped session");
            return;
        }
        error!(session, error = %err, "Pushing transaction failed, stopping generation");
        let host = self.pipeline.host().clone();
        host.post_low(async move {
            let generator = TxnTestGen { inner: self };
            if let Err(e) = generator.stop_session(Some(session)).await {
                debug!(session, error = %e, "Emergency stop found session already stopped");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedChain;

    fn generator() -> TxnTestGen {
        TxnTestGenBuilder::from_backend(Arc::new(SimulatedChain::new()))
            .with_nonce_generator(NonceGenerator::starting_at(0))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_parameters() {
        let generator = generator();
        for (period_ms, batch_size) in [(0, 2), (2501, 2), (10, 0), (10, 251), (10, 3)] {
            let err = generator
                .start_generation("salt", period_ms, batch_size)
                .await
                .unwrap_err();
            assert!(err.is_invalid_operation(), "{period_ms}/{batch_size}");
            assert!(!generator.is_running());
        }
        assert_eq!(generator.live_worker_threads(), 0);
    }

    #[tokio::test]
    async fn test_stop_while_idle_fails() {
        let generator = generator();
        let err = generator.stop_generation().await.unwrap_err();
        assert!(err.is_invalid_operation());
        assert!(generator.shutdown().await.is_ok());
    }

    #[test]
    fn test_build_outside_runtime_needs_host() {
        let result = TxnTestGenBuilder::from_backend(Arc::new(SimulatedChain::new())).build();
        assert!(matches!(result, Err(TxnTestGenError::Config(_))));
    }

    async fn wait_until_stopped(generator: &TxnTestGen) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while generator.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_restart_right_after_emergency_stop() {
        let chain = Arc::new(SimulatedChain::new());
        let generator = TxnTestGenBuilder::from_backend(chain.clone())
            .with_nonce_generator(NonceGenerator::starting_at(0))
            .build()
            .unwrap();

        chain.fail_next_submission("node crashed");
        generator.start_generation("salt", 1, 2).await.unwrap();
        wait_until_stopped(&generator).await;

        // The posted teardown may still be queued behind us.
        generator.start_generation("salt", 1, 2).await.unwrap();
        assert!(generator.is_running());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(generator.is_running());
        let summary = generator.stop_generation().await.unwrap();
        assert!(summary.transactions_executed > 0);
        assert_eq!(generator.live_worker_threads(), 0);
        assert!(generator.stop_generation().await.unwrap_err().is_invalid_operation());
    }

    #[tokio::test]
    async fn test_stop_after_emergency_stop_reports_idle() {
        let chain = Arc::new(SimulatedChain::new());
        let generator = TxnTestGenBuilder::from_backend(chain.clone())
            .with_nonce_generator(NonceGenerator::starting_at(0))
            .build()
            .unwrap();

        chain.fail_next_submission("node crashed");
        generator.start_generation("salt", 1, 2).await.unwrap();
        wait_until_stopped(&generator).await;

        let err = generator.stop_generation().await.unwrap_err();
        assert!(err.is_invalid_operation());
        assert!(!generator.is_running());
        assert_eq!(generator.live_worker_threads(), 0);
        assert_eq!(generator.statistics(), Statistics::default());
    }
}
