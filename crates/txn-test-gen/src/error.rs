//! Error types for the load generator.
//!
//! [`TxnTestGenError`] is what the public operations return. Two narrower
//! enums travel through the engine on their own: [`BuildError`] for batch
//! construction, and [`SubmissionError`] for what the backend reports.

use thiserror::Error;
use txn_test_gen_types::{TransactionId, TypesError};

/// A specialized Result type for load generator operations.
pub type TxnTestGenResult<T> = Result<T, TxnTestGenError>;

/// The main error type for the load generator.
#[derive(Error, Debug)]
pub enum TxnTestGenError {
    /// Start parameters out of range
    #[error("Invalid operation: {0}")]
    Validation(String),

    /// Start while running, or stop while idle
    #[error("Invalid operation: {0}")]
    Lifecycle(String),

    /// A transaction could not be built or signed
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// The backend failed to accept a transaction
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// The worker pool could not be started or stopped
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed name, key, asset or encoding
    #[error(transparent)]
    Types(#[from] TypesError),
}

impl TxnTestGenError {
    /// Creates a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a new lifecycle error
    pub fn lifecycle<S: Into<String>>(msg: S) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Returns true if the call was rejected without changing any state.
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Lifecycle(_))
    }

    /// Returns true if this error ends a running session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Submission(_))
    }
}

/// Errors raised while building a batch.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The backend does not know the block chosen as reference
    #[error("Unknown reference block #{0}")]
    UnknownBlock(u32),

    /// Encoding or signing failed
    #[error(transparent)]
    Types(#[from] TypesError),
}

/// Errors reported by a [`TransactionSink`](crate::chain::TransactionSink).
///
/// A transaction the backend merely rejects is not an error: it comes back as
/// a trace without a receipt. These are failures of the backend itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// The backend failed while processing a transaction
    #[error("Transaction {id} failed: {message}")]
    Failed { id: TransactionId, message: String },

    /// The backend cannot take transactions at all
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
