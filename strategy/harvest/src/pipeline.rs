//! Harvest pipeline
//!
//! Walks the configured forks in order and, for each one worth harvesting,
//! withdraws the pending rewards, then either stakes them in the masonry or
//! sells a share for profit and compounds the rest. Settlement of the
//! accumulated profit runs once after the last fork.

use alloy::primitives::{Address, U256};
use chrono::Local;
use evm::{dex, ChainClient, TxReceipt};
use tracing::{error, info, warn};
use utils::format_units;

use crate::actions::{ensure_allowance, sell};
use crate::compound::compound;
use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::fork::{Fork, ForkSet};
use crate::record::{RecordSink, RunRecord, SHARES_DECIMALS};
use crate::settle::settle;

/// Why a fork was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NothingPending,
    /// Pending rewards were not worth more than the pool minimum
    BelowMinimum { value: U256 },
    /// The withdraw left no shares in the wallet
    EmptyBalance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkOutcome {
    Skipped(SkipReason),
    Harvested(RunRecord),
}

/// What happened during one pass.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub harvested: Vec<String>,
    pub skipped: Vec<String>,
    /// Fork name and the error that stopped it
    pub failed: Vec<(String, String)>,
    /// Harvested forks whose run record could not be written
    pub unrecorded: Vec<(String, String)>,
    pub settlement: Option<TxReceipt>,
    pub settlement_error: Option<String>,
}

/// Profit and keep portions of `balance` for a take-profit of `pct` percent.
///
/// `profit == floor(balance * pct / 100)` and `profit + keep == balance`.
pub fn split_profit(balance: U256, pct: u8) -> (U256, U256) {
    let pct = U256::from(pct.min(100));
    let hundred = U256::from(100u64);
    let (q, r) = balance.div_rem(hundred);
    let profit = q * pct + r * pct / hundred;
    (profit, balance - profit)
}

/// Runs the harvest over a fork set with an injected chain client.
pub struct Harvester<C> {
    client: C,
    config: HarvestConfig,
    forks: ForkSet,
}

impl<C: ChainClient> Harvester<C> {
    /// Creates a new `Harvester`
    ///
    /// # Arguments
    /// * `client` - Chain client used for every read and transaction
    /// * `config` - Threshold, take-profit and settlement settings
    /// * `forks` - Forks to process, in order
    pub fn new(client: C, config: HarvestConfig, forks: ForkSet) -> Self {
        Self {
            client,
            config,
            forks,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Processes every fork in order, then settles profits.
    ///
    /// A failing fork is logged and recorded in the summary; the forks after
    /// it are still processed.
    ///
    /// # Arguments
    /// * `sink` - Receives one `RunRecord` per harvested fork
    ///
    /// # Returns
    /// A `RunSummary` naming the harvested, skipped, failed and unrecorded forks and the
    /// settlement result
    pub async fn run(&self, sink: &mut dyn RecordSink) -> RunSummary {
        let mut summary = RunSummary::default();

        for (name, fork) in self.forks.iter() {
            match self.harvest_fork(name, fork).await {
                Ok(ForkOutcome::Harvested(record)) => {
                    if let Err(e) = sink.append(&record).map_err(HarvestError::from) {
                        error!(fork = name, error = %e, "harvested but not recorded");
                        summary.unrecorded.push((name.to_string(), e.to_string()));
                    }
                    summary.harvested.push(name.to_string());
                }
                Ok(ForkOutcome::Skipped(reason)) => {
                    info!(fork = name, ?reason, "skipped");
                    summary.skipped.push(name.to_string());
                }
                Err(e) => {
                    error!(fork = name, error = %e, "harvest failed");
                    summary.failed.push((name.to_string(), e.to_string()));
                }
            }
        }

        match settle(&self.client, &self.config).await {
            Ok(receipt) => summary.settlement = receipt,
            Err(e) => {
                error!(error = %e, "profit settlement failed");
                summary.settlement_error = Some(e.to_string());
            }
        }

        info!(
            harvested = summary.harvested.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            bridged = summary.settlement.is_some(),
            "harvest pass complete"
        );
        summary
    }

    /// Harvests one fork.
    pub async fn harvest_fork(&self, name: &str, fork: &Fork) -> Result<ForkOutcome> {
        let wallet = self.client.wallet();
        let settlement = &self.config.settlement;

        let pending = self
            .client
            .pending_reward(fork.reward_pool, fork.pool_id, wallet)
            .await?;
        if pending.is_zero() {
            return Ok(ForkOutcome::Skipped(SkipReason::NothingPending));
        }

        let value = self
            .client
            .quote_price(fork.shares_token, settlement.token, pending)
            .await?;
        info!(
            fork = name,
            pending = %format_units(pending, SHARES_DECIMALS),
            value = %format_units(value, settlement.decimals),
            currency = %settlement.code,
            "pending rewards"
        );
        if value <= self.config.pool_minimum_raw() {
            return Ok(ForkOutcome::Skipped(SkipReason::BelowMinimum { value }));
        }

        self.client
            .submit(dex::harvest(fork.reward_pool, fork.pool_id))
            .await?;

        let balance = self.client.token_balance(fork.shares_token, wallet).await?;
        if balance.is_zero() {
            warn!(fork = name, "withdraw left no shares in the wallet");
            return Ok(ForkOutcome::Skipped(SkipReason::EmptyBalance));
        }

        let profit = if self.config.take_profit_pct > 0 {
            self.take_profit(name, fork, balance).await?
        } else {
            self.stake(fork, balance).await?
        };

        Ok(ForkOutcome::Harvested(RunRecord {
            timestamp: Local::now(),
            fork: name.to_string(),
            pending,
            value,
            currency: settlement.code.clone(),
            currency_decimals: settlement.decimals,
            profit,
        }))
    }

    /// Stakes the whole balance in the masonry; returns its settlement value.
    async fn stake(&self, fork: &Fork, balance: U256) -> Result<U256> {
        ensure_allowance(&self.client, fork.shares_token, fork.masonry, balance).await?;
        self.client.submit(dex::stake(fork.masonry, balance)).await?;
        let value = self
            .client
            .quote_price(fork.shares_token, self.config.settlement.token, balance)
            .await?;
        Ok(value)
    }

    /// Sells the profit share and compounds what is kept; returns the quoted sale value.
    async fn take_profit(&self, name: &str, fork: &Fork, balance: U256) -> Result<U256> {
        let wallet = self.client.wallet();
        let (profit_amount, keep_amount) = split_profit(balance, self.config.take_profit_pct);

        let observed = self.client.token_balance(fork.shares_token, wallet).await?;
        let profit_amount = profit_amount.min(observed);

        let realized = if profit_amount.is_zero() {
            U256::ZERO
        } else {
            sell(
                &self.client,
                &self.config,
                fork.shares_token,
                self.config.settlement.token,
                profit_amount,
                self.profit_recipient(),
            )
            .await?
        };

        if !keep_amount.is_zero() {
            match fork.lp_partner {
                Some(partner) => {
                    let remaining = self.client.token_balance(fork.shares_token, wallet).await?;
                    if !remaining.is_zero() {
                        compound(&self.client, &self.config, fork, partner, remaining).await?;
                    }
                }
                None => info!(
                    fork = name,
                    kept = %format_units(keep_amount, SHARES_DECIMALS),
                    "no LP partner, kept shares stay in the wallet"
                ),
            }
        }
        Ok(realized)
    }

    /// Where sale proceeds go: the wallet when they will be bridged, else the profit wallet.
    fn profit_recipient(&self) -> Address {
        if self.config.bridging_enabled() {
            self.client.wallet()
        } else {
            self.config.profit_wallet
        }
    }
}
