//! Configuration for the load generator.
//!
//! Values set here apply to every session a generator runs. Per-session
//! parameters (salt, period, batch size) are passed to
//! [`TxnTestGen::start_generation`](crate::TxnTestGen::start_generation).

use crate::error::{TxnTestGenError, TxnTestGenResult};
use serde::{Deserialize, Serialize};

/// Default number of worker threads driving the scheduler.
pub const DEFAULT_THREADS: u16 = 2;

/// Code and ABI of the token contract installed by
/// [`create_test_accounts`](crate::TxnTestGen::create_test_accounts).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenContract {
    #[serde(with = "hex::serde")]
    pub wasm: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub abi: Vec<u8>,
}

/// Generator configuration.
///
/// # Example
///
/// ```rust
/// use txn_test_gen::TxnTestGenConfig;
///
/// let config = TxnTestGenConfig::builder()
///     .reference_block_lag(-1)
///     .threads(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.threads, 4);
/// assert!(TxnTestGenConfig::builder().threads(0).build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxnTestGenConfig {
    /// How many blocks behind head the reference block is. Negative values
    /// select the last irreversible block.
    pub reference_block_lag: i32,
    /// Worker threads in the scheduler pool.
    pub threads: u16,
    pub token_contract: TokenContract,
}

impl Default for TxnTestGenConfig {
    fn default() -> Self {
        Self {
            reference_block_lag: 0,
            threads: DEFAULT_THREADS,
            token_contract: TokenContract::default(),
        }
    }
}

impl TxnTestGenConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TxnTestGenConfigBuilder {
        TxnTestGenConfigBuilder::default()
    }

    /// Checks the configuration for values the generator cannot run with.
    pub fn validate(&self) -> TxnTestGenResult<()> {
        if self.threads == 0 {
            return Err(TxnTestGenError::Config(
                "txn-test-gen-threads must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`TxnTestGenConfig`].
#[derive(Debug, Clone, Default)]
pub struct TxnTestGenConfigBuilder {
    reference_block_lag: Option<i32>,
    threads: Option<u16>,
    token_contract: Option<TokenContract>,
}

impl TxnTestGenConfigBuilder {
    /// Sets the reference block lag.
    pub fn reference_block_lag(mut self, lag: i32) -> Self {
        self.reference_block_lag = Some(lag);
        self
    }

    /// Sets the number of worker threads.
    pub fn threads(mut self, threads: u16) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Sets the token contract installed during bootstrap.
    pub fn token_contract(mut self, contract: TokenContract) -> Self {
        self.token_contract = Some(contract);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TxnTestGenError::Config`] if `threads` is zero.
    pub fn build(self) -> TxnTestGenResult<TxnTestGenConfig> {
        let defaults = TxnTestGenConfig::default();
        let config = TxnTestGenConfig {
            reference_block_lag: self
                .reference_block_lag
                .unwrap_or(defaults.reference_block_lag),
            threads: self.threads.unwrap_or(defaults.threads),
            token_contract: self.token_contract.unwrap_or(defaults.token_contract),
        };
        config.validate()?;
        Ok(config)
    }
}
