//! Fork harvester: one pass over the configured tomb forks, then exit.
//!
//! Usage: fork-harvester [--take-profits | --take-profit-pct N] [--pool-minimum N]
//!        [--profit-wallet ADDR] [--profit-chain ID] [--profit-coin CODE]
//!        [--log-file PATH] [--fork NAME,...] [--slippage-bps N]
//!
//! Reads ADDRESS, PRIVATE_KEY, PROFIT_WALLET and PROVIDER from the environment
//! (a `.env` file is loaded first).

use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{bail, Context, Result};
use clap::Parser;
use evm::{AlloyChainClient, ChainClientConfig};
use harvest::fork::parse_address;
use harvest::{
    catalog, ConfigError, EnvSettings, HarvestConfig, Harvester, RunLog, SettlementCurrency,
    DEFAULT_FORKS,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "fork-harvester", about = "Harvest your tomb fork yields!")]
struct Cli {
    /// Sell the whole harvest instead of staking it in the masonry
    #[arg(long, conflicts_with = "take_profit_pct")]
    take_profits: bool,

    /// Sell this percentage of each harvest and compound the rest
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    take_profit_pct: Option<u8>,

    /// Minimum value, in whole settlement-currency units, of pending rewards worth harvesting
    #[arg(long, default_value_t = 100)]
    pool_minimum: u64,

    /// Profit wallet, overriding $PROFIT_WALLET
    #[arg(long)]
    profit_wallet: Option<String>,

    /// Chain id to bridge profits to; 0 keeps them on this chain
    #[arg(long, default_value_t = 137)]
    profit_chain: u64,

    /// Currency profits are sold into
    #[arg(long, default_value = "USDC")]
    profit_coin: String,

    /// Append-only run log
    #[arg(long, default_value = "harvester.log")]
    log_file: PathBuf,

    /// Forks to harvest, in order
    #[arg(long = "fork", value_delimiter = ',')]
    forks: Vec<String>,

    /// Slippage tolerance in basis points for trades and liquidity adds; unset accepts any output
    #[arg(long)]
    slippage_bps: Option<u32>,

    /// Seconds to wait for each transaction to be mined
    #[arg(long, default_value_t = 300)]
    receipt_timeout_secs: u64,

    /// Retries for reads failing at the transport level
    #[arg(long, default_value_t = 3)]
    read_retries: u32,
}

impl Cli {
    fn take_profit_pct(&self) -> u8 {
        if self.take_profits {
            100
        } else {
            self.take_profit_pct.unwrap_or(0)
        }
    }

    fn fork_names(&self) -> Vec<String> {
        if self.forks.is_empty() {
            DEFAULT_FORKS.iter().map(|s| s.to_string()).collect()
        } else {
            self.forks.clone()
        }
    }

    fn harvest_config(&self, env_profit_wallet: Option<Address>) -> Result<HarvestConfig, ConfigError> {
        let profit_wallet = match &self.profit_wallet {
            Some(raw) => parse_address("--profit-wallet", raw)?,
            None => env_profit_wallet.ok_or(ConfigError::MissingEnv("PROFIT_WALLET"))?,
        };
        let settlement = SettlementCurrency::from_code(&self.profit_coin)?;

        let mut config = HarvestConfig::new(profit_wallet, settlement);
        config.pool_minimum = self.pool_minimum;
        config.take_profit_pct = self.take_profit_pct();
        config.profit_chain = self.profit_chain;
        config.slippage_bps = self.slippage_bps;
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let env = EnvSettings::from_process()?;
    let signer: PrivateKeySigner = env
        .private_key
        .parse()
        .map_err(|_| ConfigError::Invalid("PRIVATE_KEY is not a valid private key".into()))?;
    if signer.address() != env.wallet {
        return Err(ConfigError::Invalid(format!(
            "PRIVATE_KEY belongs to {}, not ADDRESS {}",
            signer.address(),
            env.wallet
        ))
        .into());
    }
    let config = cli.harvest_config(env.profit_wallet)?;
    let forks = catalog()?.select(cli.fork_names().as_slice())?;
    let rpc_url: Url = env
        .provider_url
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("PROVIDER is not a valid URL: {e}")))?;

    let mut chain_config = ChainClientConfig::fantom(rpc_url);
    chain_config.receipt_timeout = Duration::from_secs(cli.receipt_timeout_secs);
    chain_config.read_retries = cli.read_retries;
    let client = AlloyChainClient::new(chain_config, signer);

    let mut log = RunLog::open(&cli.log_file)
        .with_context(|| format!("opening run log {}", cli.log_file.display()))?;

    info!(
        wallet = %env.wallet,
        forks = ?forks.names(),
        take_profit_pct = config.take_profit_pct,
        pool_minimum = config.pool_minimum,
        currency = %config.settlement.code,
        profit_chain = config.profit_chain,
        log = %log.path().display(),
        "starting harvest"
    );

    let harvester = Harvester::new(client, config, forks);
    let summary = harvester.run(&mut log).await;

    for (fork, error) in &summary.failed {
        warn!(fork = %fork, %error, "fork not harvested this run");
    }
    for (fork, error) in &summary.unrecorded {
        warn!(fork = %fork, %error, "harvested fork missing from the run log");
    }
    if let Some(error) = summary.settlement_error {
        bail!("profit settlement failed: {error}");
    }
    Ok(())
}
