//! The fixed accounts, contract actions and keys used for load generation.

use txn_test_gen_types::{Checksum256, Name, PrivateKey};

/// First transfer party.
pub const ACCOUNT_A: Name = Name::from_static("txn.test.a");
/// Second transfer party.
pub const ACCOUNT_B: Name = Name::from_static("txn.test.b");
/// Hosts the token contract and issues the tokens.
pub const TOKEN_ACCOUNT: Name = Name::from_static("txn.test.t");

pub const NEWACCOUNT: Name = Name::from_static("newaccount");
pub const SETCODE: Name = Name::from_static("setcode");
pub const SETABI: Name = Name::from_static("setabi");
pub const CREATE: Name = Name::from_static("create");
pub const ISSUE: Name = Name::from_static("issue");
pub const TRANSFER: Name = Name::from_static("transfer");
pub const NONCE: Name = Name::from_static("nonce");

/// Derives a test key from a seed character: the seed is the SHA-256 of the
/// character repeated 64 times.
pub fn test_key(seed: char) -> PrivateKey {
    let seed = Checksum256::hash(seed.to_string().repeat(64));
    PrivateKey::regenerate(&seed)
}

pub fn account_a_key() -> PrivateKey {
    test_key('a')
}

pub fn account_b_key() -> PrivateKey {
    test_key('b')
}

pub fn token_account_key() -> PrivateKey {
    test_key('c')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_names() {
        assert_eq!(ACCOUNT_A.to_string(), "txn.test.a");
        assert_eq!(ACCOUNT_B.to_string(), "txn.test.b");
        assert_eq!(TOKEN_ACCOUNT.to_string(), "txn.test.t");
    }

    #[test]
    fn test_keys_are_distinct_and_stable() {
        assert_eq!(account_a_key().public_key(), test_key('a').public_key());
        assert_ne!(account_a_key().public_key(), account_b_key().public_key());
        assert_ne!(account_b_key().public_key(), token_account_key().public_key());
    }
}
