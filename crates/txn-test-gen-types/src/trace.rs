//! What a node reports back after applying a transaction.

use crate::checksum::TransactionId;
use serde::{Deserialize, Serialize};

/// Final status of an applied transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Executed,
    SoftFail,
    HardFail,
    Expired,
}

/// Resource usage billed to an accepted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub status: TransactionStatus,
    pub cpu_usage_us: u32,
    pub net_usage_words: u32,
}

/// The outcome of pushing a transaction.
///
/// A trace with a receipt was accepted; one without was rejected and carries
/// the reason in `except`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTrace {
    pub id: TransactionId,
    pub receipt: Option<TransactionReceipt>,
    pub except: Option<String>,
}

impl TransactionTrace {
    pub fn accepted(id: TransactionId, receipt: TransactionReceipt) -> Self {
        Self {
            id,
            receipt: Some(receipt),
            except: None,
        }
    }

    pub fn rejected(id: TransactionId, reason: impl Into<String>) -> Self {
        Self {
            id,
            receipt: None,
            except: Some(reason.into()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.receipt.is_some()
    }

    /// CPU time billed, or zero when rejected.
    pub fn billed_cpu_us(&self) -> u64 {
        self.receipt.map_or(0, |r| u64::from(r.cpu_usage_us))
    }
}
