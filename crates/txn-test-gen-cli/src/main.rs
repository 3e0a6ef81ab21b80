//! Drives the transaction test generator against an in-process simulated
//! chain and reports the achieved throughput.

mod logging;
mod output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use txn_test_gen::{SimulatedChain, TokenContract, TxnTestGenBuilder, TxnTestGenConfig};

/// The simulated chain does not check authorities, so any key will do.
const DEV_CREATOR_KEY: &str = "1111111111111111111111111111111111111111111111111111111111111111";

/// Transaction load generator
#[derive(Parser, Debug)]
#[command(name = "txn-test-gen", version, about, long_about = None)]
struct Cli {
    /// Memo attached to every generated transfer
    #[arg(long, default_value = "txn-test-gen")]
    salt: String,

    /// Milliseconds between batches, at most 2500
    #[arg(long, default_value_t = 20)]
    period_ms: u64,

    /// Transactions per batch, an even number up to 250
    #[arg(long, default_value_t = 20)]
    batch_size: u64,

    /// How long to generate load for
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,

    /// Block interval of the simulated chain
    #[arg(long, default_value_t = 500)]
    block_interval_ms: u64,

    /// Blocks between head and the last irreversible block
    #[arg(long, default_value_t = 2)]
    irreversible_lag: u32,

    /// JSON file with generator settings; flags below override it
    #[arg(long, env = "TXN_TEST_GEN_CONFIG")]
    config: Option<PathBuf>,

    /// Blocks behind head used as reference block; negative means the last
    /// irreversible block
    #[arg(long, allow_hyphen_values = true)]
    txn_reference_block_lag: Option<i32>,

    /// Worker threads for the batch scheduler
    #[arg(long)]
    txn_test_gen_threads: Option<u16>,

    /// Token contract code to install during bootstrap
    #[arg(long)]
    token_wasm: Option<PathBuf>,

    /// Token contract ABI to install during bootstrap
    #[arg(long)]
    token_abi: Option<PathBuf>,

    /// Account that creates the test accounts
    #[arg(long, default_value = "eosio")]
    creator: String,

    /// Hex-encoded private key of the creator
    #[arg(
        long,
        env = "TXN_TEST_GEN_CREATOR_KEY",
        hide_env_values = true,
        default_value = DEV_CREATOR_KEY
    )]
    creator_key: String,

    /// Output the summary as JSON
    #[arg(long)]
    json: bool,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn generator_config(&self) -> Result<TxnTestGenConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str::<TxnTestGenConfig>(&contents)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => TxnTestGenConfig::default(),
        };

        if let Some(lag) = self.txn_reference_block_lag {
            config.reference_block_lag = lag;
        }
        if let Some(threads) = self.txn_test_gen_threads {
            config.threads = threads;
        }
        if let Some(path) = &self.token_wasm {
            config.token_contract.wasm = read_file(path)?;
        }
        if let Some(path) = &self.token_abi {
            config.token_contract.abi = read_file(path)?;
        }
        if config.token_contract == TokenContract::default() {
            info!("No token contract given, installing an empty one");
        }
        config.validate()?;
        Ok(config)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if cli.block_interval_ms == 0 {
        bail!("--block-interval-ms must be greater than zero");
    }
    let config = cli.generator_config()?;

    let chain = Arc::new(
        SimulatedChain::new()
            .with_irreversible_lag(cli.irreversible_lag)
            .without_transaction_log(),
    );
    let producer = chain.spawn_block_producer(Duration::from_millis(cli.block_interval_ms));

    let generator = TxnTestGenBuilder::from_backend(chain.clone())
        .with_config(config)
        .build()?;

    generator
        .create_test_accounts(&cli.creator, &cli.creator_key)
        .await
        .context("Failed to create test accounts")?;
    generator
        .start_generation(&cli.salt, cli.period_ms, cli.batch_size)
        .await
        .context("Failed to start generation")?;

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(cli.duration_secs)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping early"),
    }

    let summary = match generator.stop_generation().await {
        Ok(summary) => summary,
        Err(e) if e.is_invalid_operation() => {
            producer.abort();
            bail!("Generation stopped before the run finished, see the log for the cause");
        }
        Err(e) => return Err(e.into()),
    };
    generator.shutdown().await?;
    producer.abort();

    if cli.json {
        output::print_json(&serde_json::to_value(summary)?)?;
    } else {
        output::print_summary(&summary);
    }
    Ok(())
}
