//! Ledger primitives for the transaction test generator.
//!
//! Names, assets, keys, actions and transactions with the encodings a node
//! expects: BCS for anything that is hashed or signed, and readable strings
//! in JSON.

mod action;
mod asset;
mod checksum;
mod crypto;
mod error;
mod name;
mod trace;
mod transaction;

pub use action::{
    Action, Authority, Create, Issue, KeyWeight, NewAccount, PermissionLevel,
    PermissionLevelWeight, SetAbi, SetCode, Transfer, ACTIVE, NULL_ACCOUNT, OWNER,
    SYSTEM_ACCOUNT,
};
pub use asset::{Asset, Symbol};
pub use checksum::{BlockId, ChainId, Checksum256, TimePointSec, TransactionId};
pub use crypto::{PrivateKey, PublicKey, Signature};
pub use error::{TypesError, TypesResult};
pub use name::Name;
pub use trace::{TransactionReceipt, TransactionStatus, TransactionTrace};
pub use transaction::{PackedTransaction, SignedTransaction, Transaction};
