//! Builds the signed transactions submitted on each tick.

use crate::accounts::NONCE;
use crate::chain::ChainState;
use crate::error::BuildError;
use crate::nonce::{NonceGenerator, NonceToken};
use crate::template::{TransferTemplate, TransferTemplates};
use std::time::Duration;
use txn_test_gen_types::{
    Action, BlockId, ChainId, PackedTransaction, SignedTransaction, TimePointSec, Transaction,
    NULL_ACCOUNT,
};

/// How long after the head block time a generated transaction expires.
pub const TRANSACTION_EXPIRATION: Duration = Duration::from_secs(30);

/// Net usage limit of a generated transfer.
pub const MAX_NET_USAGE_WORDS: u32 = 100;

/// Picks the number of the block transactions should reference.
///
/// A negative lag selects the last irreversible block. Otherwise the block
/// `lag` behind head is used, clamped to block 0.
pub fn select_reference_block_num(lag: i32, head: u32, last_irreversible: u32) -> u32 {
    match u32::try_from(lag) {
        Ok(lag) => head.saturating_sub(lag),
        Err(_) => last_irreversible,
    }
}

/// Chain state sampled once per batch.
#[derive(Clone, Copy, Debug)]
pub struct BatchContext {
    pub reference_block: BlockId,
    pub chain_id: ChainId,
    pub expiration: TimePointSec,
}

impl BatchContext {
    pub fn from_chain(
        chain: &dyn ChainState,
        reference_block_lag: i32,
    ) -> Result<Self, BuildError> {
        let head = chain.head_block_num();
        let block_num = select_reference_block_num(
            reference_block_lag,
            head,
            chain.last_irreversible_block_num(),
        );
        let reference_block = if block_num == head {
            chain.head_block_id()
        } else {
            chain
                .block_id_for_num(block_num)
                .ok_or(BuildError::UnknownBlock(block_num))?
        };
        Ok(Self {
            reference_block,
            chain_id: chain.chain_id(),
            expiration: chain
                .head_block_time()
                .saturating_add(TRANSACTION_EXPIRATION),
        })
    }
}

/// The transactions of one tick, alternating A→B and B→A.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    transactions: Vec<PackedTransaction>,
}

impl Batch {
    pub fn transactions(&self) -> &[PackedTransaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<PackedTransaction> {
        self.transactions
    }
}

/// Builds `2 * half_batch` transactions, each with a fresh nonce token
/// carrying `prefix`.
///
/// If any transaction fails to build the whole batch is dropped.
pub fn build_batch(
    half_batch: u64,
    templates: &TransferTemplates,
    nonces: &NonceGenerator,
    prefix: u64,
    context: &BatchContext,
) -> Result<Batch, BuildError> {
    let capacity = usize::try_from(half_batch.saturating_mul(2)).unwrap_or(usize::MAX);
    let mut transactions = Vec::with_capacity(capacity);
    for _ in 0..half_batch {
        for template in [&templates.a_to_b, &templates.b_to_a] {
            let token = nonces.next(prefix);
            transactions.push(build_transaction(template, token, context)?);
        }
    }
    Ok(Batch { transactions })
}

/// Builds and signs a single transfer.
pub fn build_transaction(
    template: &TransferTemplate,
    token: NonceToken,
    context: &BatchContext,
) -> Result<PackedTransaction, BuildError> {
    let nonce = Action::new(NULL_ACCOUNT, NONCE, Vec::new(), &token.to_string())?;
    let mut transaction = Transaction {
        expiration: context.expiration,
        max_net_usage_words: MAX_NET_USAGE_WORDS,
        context_free_actions: vec![nonce],
        actions: vec![template.action().clone()],
        ..Default::default()
    };
    transaction.set_reference_block(&context.reference_block);

    let signed = SignedTransaction::new(transaction).signed(template.key(), &context.chain_id)?;
    Ok(PackedTransaction::new(signed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{ACCOUNT_A, ACCOUNT_B};
    use proptest::prelude::*;
    use txn_test_gen_types::{Checksum256, Transfer};

    fn context() -> BatchContext {
        BatchContext {
            reference_block: BlockId::new(70_000, Checksum256::hash(b"block")),
            chain_id: Checksum256::hash(b"chain"),
            expiration: TimePointSec::from_secs(1_000_030),
        }
    }

    #[test]
    fn test_reference_block_selection() {
        assert_eq!(select_reference_block_num(-1, 100, 42), 42);
        assert_eq!(select_reference_block_num(0, 100, 42), 100);
        assert_eq!(select_reference_block_num(5, 100, 42), 95);
        assert_eq!(select_reference_block_num(5, 3, 1), 0);
        assert_eq!(select_reference_block_num(3, 3, 1), 0);
    }

    #[test]
    fn test_batch_alternates_directions() {
        let templates = TransferTemplates::new("salt").unwrap();
        let nonces = NonceGenerator::starting_at(1000);
        let batch = build_batch(5, &templates, &nonces, 3, &context()).unwrap();
        assert_eq!(batch.transactions().len(), 10);

        for (i, packed) in batch.transactions().iter().enumerate() {
            let transfer: Transfer = packed.transaction().actions[0].decode().unwrap();
            let (from, to) = if i % 2 == 0 {
                (ACCOUNT_A, ACCOUNT_B)
            } else {
                (ACCOUNT_B, ACCOUNT_A)
            };
            assert_eq!((transfer.from, transfer.to), (from, to));

            let nonce: String = packed.transaction().context_free_actions[0]
                .decode()
                .unwrap();
            assert_eq!(nonce, format!("3{}", 1000 + i));
        }
    }

    #[test]
    fn test_transaction_fields() {
        let templates = TransferTemplates::new("salt").unwrap();
        let ctx = context();
        let token = NonceToken {
            prefix: 0,
            sequence: 9,
        };
        let packed = build_transaction(&templates.b_to_a, token, &ctx).unwrap();
        let trx = packed.transaction();
        assert_eq!(trx.expiration, ctx.expiration);
        assert_eq!(trx.max_net_usage_words, MAX_NET_USAGE_WORDS);
        assert!(trx.references(&ctx.reference_block));
        assert_eq!(trx.context_free_actions[0].account, NULL_ACCOUNT);
        assert_eq!(trx.context_free_actions[0].name, NONCE);
        assert!(trx.context_free_actions[0].authorization.is_empty());

        let digest = trx.signing_digest(&ctx.chain_id).unwrap();
        assert!(templates
            .b_to_a
            .key()
            .public_key()
            .verify_digest(&digest, &packed.signatures()[0])
            .is_ok());
    }

    #[test]
    fn test_ids_are_unique_within_batch() {
        let templates = TransferTemplates::new("salt").unwrap();
        let nonces = NonceGenerator::starting_at(0);
        let batch = build_batch(50, &templates, &nonces, 0, &context()).unwrap();
        let ids: std::collections::HashSet<_> =
            batch.transactions().iter().map(|t| t.id()).collect();
        assert_eq!(ids.len(), 100);
    }

    proptest! {
        #[test]
        fn prop_reference_block_never_exceeds_head(
            lag in 0i32..10_000,
            head in 0u32..10_000,
            lib in 0u32..10_000,
        ) {
            let selected = select_reference_block_num(lag, head, lib);
            prop_assert!(selected <= head);
            prop_assert_eq!(selected, head.saturating_sub(lag as u32));
        }

        #[test]
        fn prop_negative_lag_selects_lib(
            lag in i32::MIN..0,
            head in any::<u32>(),
            lib in any::<u32>(),
        ) {
            prop_assert_eq!(select_reference_block_num(lag, head, lib), lib);
        }
    }
}
