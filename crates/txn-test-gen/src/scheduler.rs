//! A cancellable fixed-rate ticker.

use std::ops::ControlFlow;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fires a callback every `period`, starting at a given instant.
///
/// Deadlines advance from the previous deadline rather than from when the
/// callback ran, so the rate does not drift; deadlines that were missed fire
/// back to back. The callback receives the index of the tick (0, 1, 2, ...)
/// and can end the ticker by returning [`ControlFlow::Break`].
#[derive(Debug)]
pub struct Scheduler {
    cancel: CancellationToken,
    task: JoinHandle<u64>,
}

impl Scheduler {
    /// Arms the ticker on `handle`.
    pub fn arm<F>(handle: &Handle, period: Duration, start: Instant, mut on_tick: F) -> Self
    where
        F: FnMut(u64) -> ControlFlow<()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = period.max(Duration::from_millis(1));
        let task = handle.spawn(async move {
            let mut interval = time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

            let mut ticks = 0u64;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                // Cancellation may have raced with the deadline.
                if token.is_cancelled() {
                    break;
                }
                let flow = on_tick(ticks);
                ticks += 1;
                if flow.is_break() {
                    break;
                }
            }
            debug!(ticks, "Scheduler stopped");
            ticks
        });
        Self { cancel, task }
    }

    /// Prevents any further ticks. Work already handed off by earlier ticks
    /// is not affected.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels the ticker and waits for it to exit, returning how many ticks
    /// fired.
    pub async fn stop(self) -> u64 {
        self.cancel();
        self.task.await.unwrap_or_default()
    }
}
