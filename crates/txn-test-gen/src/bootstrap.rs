//! Creates the test accounts and funds them with the test token.

use crate::accounts::{
    account_a_key, account_b_key, token_account_key, ACCOUNT_A, ACCOUNT_B, CREATE, ISSUE,
    NEWACCOUNT, SETABI, SETCODE, TOKEN_ACCOUNT, TRANSFER,
};
use crate::batch::TRANSACTION_EXPIRATION;
use crate::error::TxnTestGenResult;
use crate::generator::TxnTestGen;
use serde::Serialize;
use tracing::info;
use txn_test_gen_types::{
    Action, Asset, Authority, BlockId, ChainId, Create, Issue, Name, NewAccount, PackedTransaction,
    PermissionLevel, PrivateKey, SetAbi, SetCode, SignedTransaction, TimePointSec, Transaction,
    Transfer, TypesResult, SYSTEM_ACCOUNT,
};

/// Maximum supply of the test token.
pub const MAX_SUPPLY: &str = "1000000000.0000 CUR";
/// Amount issued to the token account.
pub const ISSUED: &str = "60000.0000 CUR";
/// Amount each transfer account is funded with.
pub const FUNDING: &str = "20000.0000 CUR";

/// Net usage limit of the contract deployment transaction.
const DEPLOY_MAX_NET_USAGE_WORDS: u32 = 5000;

struct Draft {
    chain_id: ChainId,
    reference_block: BlockId,
    expiration: TimePointSec,
}

impl Draft {
    fn sign(
        &self,
        actions: Vec<Action>,
        max_net_usage_words: u32,
        key: &PrivateKey,
    ) -> TypesResult<PackedTransaction> {
        let mut transaction = Transaction {
            expiration: self.expiration,
            max_net_usage_words,
            actions,
            ..Default::default()
        };
        transaction.set_reference_block(&self.reference_block);
        PackedTransaction::new(SignedTransaction::new(transaction).signed(key, &self.chain_id)?)
    }
}

fn action<T: Serialize>(
    account: Name,
    name: Name,
    actor: Name,
    payload: &T,
) -> TypesResult<Action> {
    Action::new(account, name, vec![PermissionLevel::active(actor)], payload)
}

impl TxnTestGen {
    /// Creates `txn.test.a`, `txn.test.b` and `txn.test.t`, deploys the
    /// configured token contract on `txn.test.t` and funds the two transfer
    /// accounts.
    ///
    /// `creator` must be an existing account whose active key is
    /// `creator_key` (hex). Resolves once the backend has answered for both
    /// transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or key is malformed, signing fails, or
    /// the backend fails or rejects either transaction.
    pub async fn create_test_accounts(
        &self,
        creator: &str,
        creator_key: &str,
    ) -> TxnTestGenResult<()> {
        let creator = Name::parse(creator)?;
        let creator_key = PrivateKey::from_hex(creator_key)?;

        let chain = &self.inner.chain;
        let draft = Draft {
            chain_id: chain.chain_id(),
            reference_block: chain.head_block_id(),
            expiration: chain.head_block_time().saturating_add(TRANSACTION_EXPIRATION),
        };

        let mut new_accounts = Vec::with_capacity(3);
        for (name, key) in [
            (ACCOUNT_A, account_a_key()),
            (ACCOUNT_B, account_b_key()),
            (TOKEN_ACCOUNT, token_account_key()),
        ] {
            let authority = Authority::single_key(key.public_key());
            let payload = NewAccount {
                creator,
                name,
                owner: authority.clone(),
                active: authority,
            };
            new_accounts.push(action(SYSTEM_ACCOUNT, NEWACCOUNT, creator, &payload)?);
        }
        let create_accounts = draft.sign(new_accounts, 0, &creator_key)?;

        let contract = &self.inner.config.token_contract;
        let transfer = |to: Name| -> TypesResult<Action> {
            let payload = Transfer {
                from: TOKEN_ACCOUNT,
                to,
                quantity: FUNDING.parse()?,
                memo: String::new(),
            };
            action(TOKEN_ACCOUNT, TRANSFER, TOKEN_ACCOUNT, &payload)
        };
        let deploy = vec![
            action(
                SYSTEM_ACCOUNT,
                SETCODE,
                TOKEN_ACCOUNT,
                &SetCode {
                    account: TOKEN_ACCOUNT,
                    vm_type: 0,
                    vm_version: 0,
                    code: contract.wasm.clone(),
                },
            )?,
            action(
                SYSTEM_ACCOUNT,
                SETABI,
                TOKEN_ACCOUNT,
                &SetAbi {
                    account: TOKEN_ACCOUNT,
                    abi: contract.abi.clone(),
                },
            )?,
            action(
                TOKEN_ACCOUNT,
                CREATE,
                TOKEN_ACCOUNT,
                &Create {
                    issuer: TOKEN_ACCOUNT,
                    maximum_supply: MAX_SUPPLY.parse::<Asset>()?,
                },
            )?,
            action(
                TOKEN_ACCOUNT,
                ISSUE,
                TOKEN_ACCOUNT,
                &Issue {
                    to: TOKEN_ACCOUNT,
                    quantity: ISSUED.parse::<Asset>()?,
                    memo: String::new(),
                },
            )?,
            transfer(ACCOUNT_A)?,
            transfer(ACCOUNT_B)?,
        ];
        let deploy_token = draft.sign(deploy, DEPLOY_MAX_NET_USAGE_WORDS, &token_account_key())?;

        self.inner
            .pipeline
            .accept_in_order(vec![create_accounts, deploy_token])
            .await?;

        info!(creator = %creator, "Created test accounts");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::accounts::{token_account_key, ACCOUNT_A, TOKEN_ACCOUNT};
    use crate::chain::ChainState;
    use crate::generator::TxnTestGenBuilder;
    use crate::simulated::SimulatedChain;
    use std::sync::Arc;
    use txn_test_gen_types::{NewAccount, Transfer};

    const CREATOR_KEY: &str = "1111111111111111111111111111111111111111111111111111111111111111";

    #[tokio::test]
    async fn test_create_test_accounts() {
        let chain = Arc::new(SimulatedChain::new());
        let generator = TxnTestGenBuilder::from_backend(chain.clone()).build().unwrap();
        generator
            .create_test_accounts("eosio", CREATOR_KEY)
            .await
            .unwrap();

        let accepted = chain.accepted_transactions();
        assert_eq!(accepted.len(), 2);

        let create = accepted[0].transaction();
        assert_eq!(create.actions.len(), 3);
        let first: NewAccount = create.actions[0].decode().unwrap();
        assert_eq!(first.name, ACCOUNT_A);
        assert_eq!(first.creator.to_string(), "eosio");

        let deploy = accepted[1].transaction();
        assert_eq!(deploy.max_net_usage_words, 5000);
        assert_eq!(deploy.actions.len(), 6);
        let funding: Transfer = deploy.actions[4].decode().unwrap();
        assert_eq!(funding.from, TOKEN_ACCOUNT);
        assert_eq!(funding.quantity.to_string(), "20000.0000 CUR");

        let digest = deploy.signing_digest(&chain.chain_id()).unwrap();
        assert!(token_account_key()
            .public_key()
            .verify_digest(&digest, &accepted[1].signatures()[0])
            .is_ok());
        assert_eq!(generator.statistics().accepted_count, 0);
    }

    #[tokio::test]
    async fn test_rejects_malformed_input() {
        let generator = TxnTestGenBuilder::from_backend(Arc::new(SimulatedChain::new()))
            .build()
            .unwrap();
        assert!(generator
            .create_test_accounts("Not A Name", CREATOR_KEY)
            .await
            .is_err());
        assert!(generator
            .create_test_accounts("eosio", "not-hex")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let chain = Arc::new(SimulatedChain::new());
        let generator = TxnTestGenBuilder::from_backend(chain.clone()).build().unwrap();
        chain.fail_next_submission("disk full");
        let err = generator
            .create_test_accounts("eosio", CREATOR_KEY)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_rejected_account_creation_stops_bootstrap() {
        let chain = Arc::new(SimulatedChain::new());
        let generator = TxnTestGenBuilder::from_backend(chain.clone()).build().unwrap();
        generator
            .create_test_accounts("eosio", CREATOR_KEY)
            .await
            .unwrap();
        let before = chain.diagnostics().txns;

        // Same head block, so the account creation is a duplicate.
        let err = generator
            .create_test_accounts("eosio", CREATOR_KEY)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("duplicate transaction"));
        assert_eq!(chain.diagnostics().txns, before + 1);
        assert_eq!(chain.accepted_transactions().len(), 2);
    }
}
