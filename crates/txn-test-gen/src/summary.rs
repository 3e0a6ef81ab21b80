//! Throughput figures reported when a session stops.

use crate::chain::ChainDiagnostics;
use crate::pipeline::Statistics;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Assumed block interval for the per-block figures.
pub const BLOCK_INTERVAL_MS: u64 = 500;

/// What a generation session achieved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub elapsed_ms: u64,
    /// Transactions the backend accepted.
    pub transactions_executed: u64,
    pub transactions_rejected: u64,
    pub tps: f64,
    pub billed_cpu_us_per_transaction: f64,
    pub chain: ChainDiagnostics,
    /// Transactions per second as seen by block production.
    pub block_tps: f64,
    pub process_ms_per_block: f64,
    pub sig_ms_per_block: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl GenerationSummary {
    pub fn compute(elapsed: Duration, statistics: Statistics, chain: ChainDiagnostics) -> Self {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let executed = statistics.accepted_count as f64;
        let blocks = elapsed_ms as f64 / BLOCK_INTERVAL_MS as f64;
        Self {
            elapsed_ms,
            transactions_executed: statistics.accepted_count,
            transactions_rejected: statistics.rejected_count,
            tps: ratio(executed * 1000.0, elapsed_ms as f64),
            billed_cpu_us_per_transaction: ratio(
                statistics.accumulated_billed_time_us as f64,
                executed,
            ),
            chain,
            block_tps: ratio(chain.txns as f64 * 2.0, chain.blocks as f64),
            process_ms_per_block: ratio(chain.process_transaction_us as f64 / 1000.0, blocks),
            sig_ms_per_block: ratio(chain.sig_transaction_us as f64 / 1000.0, blocks),
        }
    }

    /// Emits the summary at info level.
    pub fn log(&self) {
        info!(
            transactions = self.transactions_executed,
            rejected = self.transactions_rejected,
            elapsed_ms = self.elapsed_ms,
            tps = self.tps as u64,
            "Transactions executed"
        );
        info!(
            txns = self.chain.txns,
            accepted = self.chain.accepted_txns,
            rejected = self.chain.rejected_txns,
            blocks = self.chain.blocks,
            block_tps = self.block_tps as u64,
            "Transactions produced in blocks"
        );
        info!(
            process_ms_per_block = self.process_ms_per_block as u64,
            sig_ms_per_block = self.sig_ms_per_block as u64,
            billed_cpu_us_per_transaction = self.billed_cpu_us_per_transaction,
            "Block processing cost"
        );
    }
}
