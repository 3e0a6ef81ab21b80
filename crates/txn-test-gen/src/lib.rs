//! Synthetic transaction load generation.
//!
//! [`TxnTestGen`] pushes pairs of token transfers between two test accounts
//! at a fixed rate into a backend, and reports the throughput it achieved.
//! The backend is reached through the [`ChainState`] and [`TransactionSink`]
//! traits; [`SimulatedChain`] is an in-memory implementation of both.

pub mod accounts;
pub mod batch;
mod bootstrap;
pub mod chain;
pub mod config;
pub mod error;
pub mod generator;
pub mod nonce;
pub mod pipeline;
pub mod scheduler;
pub mod simulated;
pub mod summary;
pub mod template;
pub mod worker_pool;

pub use bootstrap::{FUNDING, ISSUED, MAX_SUPPLY};
pub use chain::{ChainDiagnostics, ChainState, HostExecutor, TransactionSink};
pub use config::{TokenContract, TxnTestGenConfig, TxnTestGenConfigBuilder};
pub use error::{BuildError, SubmissionError, TxnTestGenError, TxnTestGenResult};
pub use generator::{TxnTestGen, TxnTestGenBuilder, MAX_BATCH_SIZE, MAX_PERIOD_MS};
pub use nonce::{NonceGenerator, NonceToken};
pub use pipeline::Statistics;
pub use simulated::SimulatedChain;
pub use summary::GenerationSummary;
