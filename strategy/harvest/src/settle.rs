//! Profit settlement: bridge the wallet's settlement-currency balance to the profit chain.

use evm::{dex, ChainClient, TxReceipt};
use tracing::info;
use utils::format_units;

use crate::actions::ensure_allowance;
use crate::config::HarvestConfig;
use crate::error::Result;

/// Bridges the wallet's whole settlement balance to `profit_wallet` on `profit_chain`.
///
/// Does nothing when bridging is disabled or the balance is zero. Runs once;
/// a failed bridge is not retried.
///
/// # Arguments
/// * `client` - Chain client whose wallet holds the settlement currency
/// * `config` - Supplies the settlement currency, bridge router, profit wallet and profit chain
///
/// # Returns
/// `Result<Option<TxReceipt>>` - The bridge receipt, `None` when nothing was bridged, or the
/// read or transaction error that stopped the bridge
pub async fn settle<C: ChainClient + ?Sized>(
    client: &C,
    config: &HarvestConfig,
) -> Result<Option<TxReceipt>> {
    if !config.bridging_enabled() {
        info!("bridging disabled, profits stay on chain");
        return Ok(None);
    }

    let settlement = &config.settlement;
    let balance = client
        .token_balance(settlement.token, client.wallet())
        .await?;
    if balance.is_zero() {
        return Ok(None);
    }

    info!(
        amount = %format_units(balance, settlement.decimals),
        currency = %settlement.code,
        chain = config.profit_chain,
        to = %config.profit_wallet,
        "bridging profits"
    );
    ensure_allowance(client, settlement.token, config.bridge_router, balance).await?;
    let receipt = client
        .submit(dex::bridge_out(
            config.bridge_router,
            settlement.bridge_token,
            config.profit_wallet,
            balance,
            config.profit_chain,
        ))
        .await?;
    Ok(Some(receipt))
}
