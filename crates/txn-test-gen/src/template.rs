//! The two transfer actions every generated transaction is built around.

use crate::accounts::{
    account_a_key, account_b_key, ACCOUNT_A, ACCOUNT_B, TOKEN_ACCOUNT, TRANSFER,
};
use txn_test_gen_types::{
    Action, Asset, Name, PermissionLevel, PrivateKey, Transfer, TypesResult,
};

/// Amount moved by every generated transfer.
pub const TRANSFER_QUANTITY: &str = "1.0000 CUR";

/// A signed-by-sender transfer action, built once and reused unmodified for
/// every transaction in a session.
#[derive(Clone, Debug)]
pub struct TransferTemplate {
    action: Action,
    key: PrivateKey,
}

impl TransferTemplate {
    /// Builds a transfer of [`TRANSFER_QUANTITY`] from `from` to `to` with
    /// `salt` as memo, authorized by `from@active`.
    pub fn new(from: Name, to: Name, key: PrivateKey, salt: &str) -> TypesResult<Self> {
        let quantity: Asset = TRANSFER_QUANTITY.parse()?;
        let payload = Transfer {
            from,
            to,
            quantity,
            memo: salt.to_string(),
        };
        let action = Action::new(
            TOKEN_ACCOUNT,
            TRANSFER,
            vec![PermissionLevel::active(from)],
            &payload,
        )?;
        Ok(Self { action, key })
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// The key that signs transactions carrying this action.
    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    /// The authorizing account.
    pub fn sender(&self) -> Name {
        self.action.authorization[0].actor
    }
}

/// The A→B and B→A templates of one session.
#[derive(Clone, Debug)]
pub struct TransferTemplates {
    pub a_to_b: TransferTemplate,
    pub b_to_a: TransferTemplate,
}

impl TransferTemplates {
    pub fn new(salt: &str) -> TypesResult<Self> {
        Ok(Self {
            a_to_b: TransferTemplate::new(ACCOUNT_A, ACCOUNT_B, account_a_key(), salt)?,
            b_to_a: TransferTemplate::new(ACCOUNT_B, ACCOUNT_A, account_b_key(), salt)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_carry_salt_and_direction() {
        let templates = TransferTemplates::new("bench-1").unwrap();

        let ab: Transfer = templates.a_to_b.action().decode().unwrap();
        assert_eq!(ab.from, ACCOUNT_A);
        assert_eq!(ab.to, ACCOUNT_B);
        assert_eq!(ab.memo, "bench-1");
        assert_eq!(ab.quantity.to_string(), TRANSFER_QUANTITY);
        assert_eq!(templates.a_to_b.sender(), ACCOUNT_A);

        let ba: Transfer = templates.b_to_a.action().decode().unwrap();
        assert_eq!(ba.from, ACCOUNT_B);
        assert_eq!(ba.to, ACCOUNT_A);
        assert_eq!(templates.b_to_a.sender(), ACCOUNT_B);
        assert_eq!(templates.b_to_a.action().account, TOKEN_ACCOUNT);
    }

    #[test]
    fn test_template_keys_match_senders() {
        let templates = TransferTemplates::new("").unwrap();
        assert_eq!(
            templates.a_to_b.key().public_key(),
            account_a_key().public_key()
        );
        assert_eq!(
            templates.b_to_a.key().public_key(),
            account_b_key().public_key()
        );
    }
}
