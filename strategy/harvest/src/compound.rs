//! Compounding: turn shares into an LP position and deposit it back into the reward pool.

use alloy::primitives::{Address, U256};
use evm::dex::{self, LiquidityLeg};
use evm::{ChainClient, NATIVE};
use tracing::{info, warn};

use crate::actions::{deadline, ensure_allowance, sell};
use crate::config::HarvestConfig;
use crate::error::Result;
use crate::fork::Fork;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundOutcome {
    /// Shares sold for the partner asset
    pub traded: U256,
    /// Shares added as liquidity
    pub shares_added: U256,
    /// Partner asset added as liquidity
    pub partner_added: U256,
    /// LP tokens deposited into the reward pool
    pub deposited: U256,
}

/// Compounds `amount` of the fork's shares with `partner`.
///
/// Half is sold for the partner, both legs are added as liquidity and the
/// resulting LP balance is deposited into the fork's reward pool. Steps are
/// separate transactions; if the deposit fails the LP tokens stay in the
/// wallet.
///
/// This function performs the following steps:
/// 1. Sells `amount / 2` shares for the partner and measures what arrived
/// 2. Sizes both liquidity legs from the pair reserves, capped by the wallet balances
/// 3. Approves the router for any leg whose allowance is short
/// 4. Adds liquidity, then approves and deposits the whole LP balance
///
/// # Arguments
/// * `client` - Chain client signing every step
/// * `config` - Slippage and deadline settings
/// * `fork` - Fork whose shares token and reward pool are used
/// * `partner` - Asset paired with the shares; wrapped native is added as native
/// * `amount` - Shares to compound, normally the wallet's remaining balance
///
/// # Returns
/// `Result<CompoundOutcome>` - Amounts traded, added and deposited, or the first failing step's error
pub async fn compound<C: ChainClient + ?Sized>(
    client: &C,
    config: &HarvestConfig,
    fork: &Fork,
    partner: Address,
    amount: U256,
) -> Result<CompoundOutcome> {
    let wallet = client.wallet();
    let dex_config = client.dex().clone();
    let partner_asset = if partner == dex_config.wrapped_native {
        NATIVE
    } else {
        partner
    };

    let half = amount / U256::from(2u64);
    let before = client.token_balance(partner_asset, wallet).await?;
    if !half.is_zero() {
        sell(client, config, fork.shares_token, partner_asset, half, wallet).await?;
    }
    let after = client.token_balance(partner_asset, wallet).await?;
    let received = after.saturating_sub(before);

    let shares = client.token_balance(fork.shares_token, wallet).await?;
    let reserves = client.pair_reserves(fork.shares_token, partner).await?;

    let mut shares_amount = shares;
    let mut partner_amount = dex::quote(shares, reserves.reserve_a, reserves.reserve_b);
    if partner_amount > received {
        partner_amount = received;
        shares_amount = dex::quote(received, reserves.reserve_b, reserves.reserve_a).min(shares);
    }

    let mut outcome = CompoundOutcome {
        traded: half,
        ..CompoundOutcome::default()
    };
    if shares_amount.is_zero() || partner_amount.is_zero() {
        warn!(%shares, %received, "nothing to pair, skipping liquidity");
        return Ok(outcome);
    }

    ensure_allowance(client, fork.shares_token, dex_config.router, shares).await?;
    if partner_asset != NATIVE {
        ensure_allowance(client, partner_asset, dex_config.router, partner_amount).await?;
    }

    let request = dex::add_liquidity(
        &dex_config,
        LiquidityLeg {
            token: fork.shares_token,
            desired: shares_amount,
            min: dex::min_out(shares_amount, config.slippage_bps),
        },
        LiquidityLeg {
            token: partner_asset,
            desired: partner_amount,
            min: dex::min_out(partner_amount, config.slippage_bps),
        },
        wallet,
        deadline(config.liquidity_deadline_secs),
    );
    client.submit(request).await?;
    outcome.shares_added = shares_amount;
    outcome.partner_added = partner_amount;

    let lp_balance = client.token_balance(reserves.pair, wallet).await?;
    if lp_balance.is_zero() {
        warn!(pair = %reserves.pair, "liquidity add minted no LP tokens");
        return Ok(outcome);
    }
    ensure_allowance(client, reserves.pair, fork.reward_pool, lp_balance).await?;
    client
        .submit(dex::deposit(fork.reward_pool, fork.pool_id, lp_balance))
        .await?;
    outcome.deposited = lp_balance;

    info!(
        pool_id = fork.pool_id,
        lp = %lp_balance,
        shares = %shares_amount,
        partner = %partner_amount,
        "compounded into reward pool"
    );
    Ok(outcome)
}
