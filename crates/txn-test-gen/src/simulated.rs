//! An in-memory backend for tests and the command line driver.
//!
//! [`SimulatedChain`] keeps a list of block ids and a head time, and accepts
//! transactions the way a node's admission checks would: duplicates, expired
//! transactions, unknown reference blocks and unsigned transactions are
//! rejected, everything else is billed a fixed CPU cost. It does not execute
//! actions.

use crate::chain::{ChainDiagnostics, ChainState, TransactionSink};
use crate::error::SubmissionError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::debug;
use txn_test_gen_types::{
    BlockId, ChainId, Checksum256, PackedTransaction, TimePointSec, TransactionId,
    TransactionReceipt, TransactionStatus, TransactionTrace,
};

/// Simulated time between blocks.
pub const BLOCK_TIME: Duration = Duration::from_millis(500);
/// CPU billed for every accepted transaction.
pub const DEFAULT_CPU_COST_US: u32 = 100;
/// Time charged for recovering one signature.
pub const SIG_COST_US: u64 = 40;

#[derive(Debug)]
struct ChainData {
    blocks: Vec<BlockId>,
    head_time_ms: u64,
    irreversible_lag: u32,
    /// Ids of accepted transactions and when they expire.
    seen: HashMap<TransactionId, TimePointSec>,
    diagnostics: ChainDiagnostics,
    log: Option<Vec<PackedTransaction>>,
    fail_next: Option<String>,
}

impl ChainData {
    fn head_num(&self) -> u32 {
        u32::try_from(self.blocks.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    fn head_time(&self) -> TimePointSec {
        TimePointSec::from_secs(u32::try_from(self.head_time_ms / 1000).unwrap_or(u32::MAX))
    }

    fn produce_block(&mut self) -> BlockId {
        let previous = self.blocks.last().copied().unwrap_or_default();
        let num = self.head_num() + 1;
        let num_bytes = num.to_le_bytes();
        let digest = Checksum256::hash_of([
            previous.checksum().as_bytes().as_slice(),
            num_bytes.as_slice(),
        ]);
        let id = BlockId::new(num, digest);
        self.blocks.push(id);
        self.head_time_ms += BLOCK_TIME.as_millis() as u64;
        self.diagnostics.blocks += 1;

        let head_time = self.head_time();
        self.seen.retain(|_, expiration| *expiration > head_time);
        id
    }

    /// Resolves a transaction's 16-bit reference to the most recent block
    /// that matches it.
    fn reference_block(&self, ref_block_num: u16) -> Option<BlockId> {
        let head = self.head_num();
        let distance = u32::from((head as u16).wrapping_sub(ref_block_num));
        let num = head.checked_sub(distance)?;
        self.blocks.get(num as usize).copied()
    }

    fn check(&self, transaction: &PackedTransaction) -> Result<(), &'static str> {
        let trx = transaction.transaction();
        if self.seen.contains_key(&transaction.id()) {
            return Err("duplicate transaction");
        }
        if trx.expiration <= self.head_time() {
            return Err("expired transaction");
        }
        match self.reference_block(trx.ref_block_num) {
            Some(block) if trx.references(&block) => {}
            _ => return Err("transaction references an unknown block"),
        }
        if transaction.signatures().is_empty() {
            return Err("transaction is not signed");
        }
        Ok(())
    }
}

/// See the module level comments.
#[derive(Debug)]
pub struct SimulatedChain {
    chain_id: ChainId,
    cpu_cost_us: u32,
    data: Mutex<ChainData>,
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChain {
    /// A chain with only a genesis block, timed at the current wall clock.
    pub fn new() -> Self {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let genesis = BlockId::new(0, Checksum256::hash(b"txn-test-gen genesis"));
        Self {
            chain_id: Checksum256::hash(b"txn-test-gen simulated chain"),
            cpu_cost_us: DEFAULT_CPU_COST_US,
            data: Mutex::new(ChainData {
                blocks: vec![genesis],
                head_time_ms: now_ms,
                irreversible_lag: 0,
                seen: HashMap::new(),
                diagnostics: ChainDiagnostics::default(),
                log: Some(Vec::new()),
                fail_next: None,
            }),
        }
    }

    /// Sets the CPU time billed per accepted transaction.
    pub fn with_cpu_cost_us(mut self, cpu_cost_us: u32) -> Self {
        self.cpu_cost_us = cpu_cost_us;
        self
    }

    /// Sets how many blocks the last irreversible block trails head.
    pub fn with_irreversible_lag(self, lag: u32) -> Self {
        self.lock().irreversible_lag = lag;
        self
    }

    /// Stops keeping a copy of every accepted transaction.
    pub fn without_transaction_log(self) -> Self {
        self.lock().log = None;
        self
    }

    pub fn produce_block(&self) -> BlockId {
        self.lock().produce_block()
    }

    pub fn produce_blocks(&self, count: u32) {
        let mut data = self.lock();
        for _ in 0..count {
            data.produce_block();
        }
    }

    /// Produces a block every `interval` until the chain is dropped or the
    /// returned task is aborted.
    pub fn spawn_block_producer(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let chain = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(chain) = chain.upgrade() else {
                    break;
                };
                let id = chain.produce_block();
                debug!(block_num = id.block_num(), "Produced block");
            }
        })
    }

    /// Makes the next `accept` fail with a backend error.
    pub fn fail_next_submission(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    /// Every accepted transaction, in acceptance order.
    pub fn accepted_transactions(&self) -> Vec<PackedTransaction> {
        self.lock().log.clone().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, ChainData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChainState for SimulatedChain {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn head_block_num(&self) -> u32 {
        self.lock().head_num()
    }

    fn head_block_id(&self) -> BlockId {
        self.lock().blocks.last().copied().unwrap_or_default()
    }

    fn head_block_time(&self) -> TimePointSec {
        self.lock().head_time()
    }

    fn last_irreversible_block_num(&self) -> u32 {
        let data = self.lock();
        data.head_num().saturating_sub(data.irreversible_lag)
    }

    fn block_id_for_num(&self, block_num: u32) -> Option<BlockId> {
        self.lock().blocks.get(block_num as usize).copied()
    }

    fn reset_diagnostics(&self) {
        self.lock().diagnostics = ChainDiagnostics::default();
    }

    fn diagnostics(&self) -> ChainDiagnostics {
        self.lock().diagnostics
    }
}

#[async_trait]
impl TransactionSink for SimulatedChain {
    async fn accept(
        &self,
        transaction: PackedTransaction,
    ) -> Result<TransactionTrace, SubmissionError> {
        let id = transaction.id();
        let mut data = self.lock();
        if let Some(message) = data.fail_next.take() {
            return Err(SubmissionError::Failed { id, message });
        }

        data.diagnostics.txns += 1;
        if let Err(reason) = data.check(&transaction) {
            data.diagnostics.rejected_txns += 1;
            return Ok(TransactionTrace::rejected(id, reason));
        }

        let signatures = transaction.signatures().len() as u64;
        data.diagnostics.accepted_txns += 1;
        data.diagnostics.process_transaction_us += u64::from(self.cpu_cost_us);
        data.diagnostics.sig_transaction_us += SIG_COST_US * signatures;
        data.seen.insert(id, transaction.transaction().expiration);

        let net_usage_words = u32::try_from(transaction.packed_trx().len().div_ceil(8))
            .unwrap_or(u32::MAX);
        if let Some(log) = data.log.as_mut() {
            log.push(transaction);
        }
        Ok(TransactionTrace::accepted(
            id,
            TransactionReceipt {
                status: TransactionStatus::Executed,
                cpu_usage_us: self.cpu_cost_us,
                net_usage_words,
            },
        ))
    }
}
