//! Transactions, their signatures and the packed form handed to a node.

use crate::action::Action;
use crate::checksum::{BlockId, ChainId, Checksum256, TimePointSec, TransactionId};
use crate::crypto::{PrivateKey, Signature};
use crate::error::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};

/// An unsigned transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub expiration: TimePointSec,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
}

impl Transaction {
    /// Binds the transaction to a recent block so it cannot be replayed on a
    /// fork that does not contain that block.
    pub fn set_reference_block(&mut self, block: &BlockId) {
        // Only the low 16 bits of the number are carried.
        self.ref_block_num = (block.block_num() & 0xffff) as u16;
        self.ref_block_prefix = block.ref_block_prefix();
    }

    /// Whether the reference fields match `block`.
    pub fn references(&self, block: &BlockId) -> bool {
        self.ref_block_num == (block.block_num() & 0xffff) as u16
            && self.ref_block_prefix == block.ref_block_prefix()
    }

    /// The identifier of this transaction.
    pub fn id(&self) -> TypesResult<TransactionId> {
        let bytes = bcs::to_bytes(self).map_err(TypesError::bcs)?;
        Ok(Checksum256::hash(bytes))
    }

    /// The digest signed by authorizing keys.
    pub fn signing_digest(&self, chain_id: &ChainId) -> TypesResult<Checksum256> {
        let bytes = bcs::to_bytes(self).map_err(TypesError::bcs)?;
        Ok(Checksum256::hash_of([
            chain_id.as_bytes().as_slice(),
            bytes.as_slice(),
            Checksum256::ZERO.as_bytes().as_slice(),
        ]))
    }
}

/// A transaction together with its signatures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<Signature>,
    pub context_free_data: Vec<Vec<u8>>,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            signatures: Vec::new(),
            context_free_data: Vec::new(),
        }
    }

    /// Appends a signature by `key` for the chain `chain_id`.
    pub fn sign(&mut self, key: &PrivateKey, chain_id: &ChainId) -> TypesResult<()> {
        let digest = self.transaction.signing_digest(chain_id)?;
        self.signatures.push(key.sign_digest(&digest));
        Ok(())
    }

    /// Consumes `self` and returns the signed copy.
    pub fn signed(mut self, key: &PrivateKey, chain_id: &ChainId) -> TypesResult<Self> {
        self.sign(key, chain_id)?;
        Ok(self)
    }
}

/// A signed transaction in its wire form, with its identifier precomputed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedTransaction {
    id: TransactionId,
    signed: SignedTransaction,
    packed_trx: Vec<u8>,
}

impl PackedTransaction {
    pub fn new(signed: SignedTransaction) -> TypesResult<Self> {
        let packed_trx = bcs::to_bytes(&signed.transaction).map_err(TypesError::bcs)?;
        let id = Checksum256::hash(&packed_trx);
        Ok(Self {
            id,
            signed,
            packed_trx,
        })
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn transaction(&self) -> &Transaction {
        &self.signed.transaction
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signed.signatures
    }

    /// The encoded transaction body.
    pub fn packed_trx(&self) -> &[u8] {
        &self.packed_trx
    }
}

impl TryFrom<SignedTransaction> for PackedTransaction {
    type Error = TypesError;

    fn try_from(signed: SignedTransaction) -> Result<Self, Self::Error> {
        Self::new(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::NULL_ACCOUNT;
    use crate::name::Name;

    fn sample() -> Transaction {
        Transaction {
            expiration: TimePointSec::from_secs(1_700_000_030),
            max_net_usage_words: 100,
            context_free_actions: vec![Action::new(
                NULL_ACCOUNT,
                Name::from_static("nonce"),
                Vec::new(),
                "01",
            )
            .unwrap()],
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_block_truncates_number() {
        let block = BlockId::new(0x0001_0005, Checksum256::hash(b"block"));
        let mut trx = sample();
        trx.set_reference_block(&block);
        assert_eq!(trx.ref_block_num, 5);
        assert_eq!(trx.ref_block_prefix, block.ref_block_prefix());
        assert!(trx.references(&block));
        assert!(!trx.references(&BlockId::new(5, Checksum256::hash(b"other"))));
    }

    #[test]
    fn test_signature_verifies_against_chain_digest() {
        let key = PrivateKey::regenerate(&Checksum256::hash("a".repeat(64)));
        let chain_id = Checksum256::hash(b"chain");
        let signed = SignedTransaction::new(sample()).signed(&key, &chain_id).unwrap();
        let digest = signed.transaction.signing_digest(&chain_id).unwrap();
        assert!(key
            .public_key()
            .verify_digest(&digest, &signed.signatures[0])
            .is_ok());

        let other_chain = signed
            .transaction
            .signing_digest(&Checksum256::hash(b"other"))
            .unwrap();
        assert!(key
            .public_key()
            .verify_digest(&other_chain, &signed.signatures[0])
            .is_err());
    }

    #[test]
    fn test_packed_id_depends_on_body_only() {
        let key = PrivateKey::regenerate(&Checksum256::hash("b".repeat(64)));
        let trx = sample();
        let unsigned = PackedTransaction::new(SignedTransaction::new(trx.clone())).unwrap();
        let signed = PackedTransaction::try_from(
            SignedTransaction::new(trx.clone())
                .signed(&key, &Checksum256::ZERO)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(unsigned.id(), signed.id());
        assert_eq!(signed.id(), trx.id().unwrap());
        assert_eq!(signed.signatures().len(), 1);

        let mut changed = trx;
        changed.context_free_actions[0].data = vec![2, b'0', b'2'];
        assert_ne!(changed.id().unwrap(), unsigned.id());
    }
}
