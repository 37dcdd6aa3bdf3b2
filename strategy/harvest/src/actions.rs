//! Transaction steps shared by the pipeline, compounding and settlement.

use alloy::primitives::{Address, U256};
use chrono::Utc;
use evm::{dex, ChainClient, TxReceipt};
use tracing::debug;

use crate::config::HarvestConfig;
use crate::error::Result;

/// Approves exactly `amount` for `spender` unless the current allowance already covers it.
pub(crate) async fn ensure_allowance<C: ChainClient + ?Sized>(
    client: &C,
    token: Address,
    spender: Address,
    amount: U256,
) -> Result<Option<TxReceipt>> {
    let current = client.allowance(token, client.wallet(), spender).await?;
    if current >= amount {
        debug!(%token, %spender, %current, "allowance sufficient");
        return Ok(None);
    }
    let receipt = client.submit(dex::approve(token, spender, amount)).await?;
    Ok(Some(receipt))
}

/// Sells exactly `amount` of `from` for `to`, sending the output to `recipient`.
///
/// Returns the amount quoted just before trading.
pub(crate) async fn sell<C: ChainClient + ?Sized>(
    client: &C,
    config: &HarvestConfig,
    from: Address,
    to: Address,
    amount: U256,
    recipient: Address,
) -> Result<U256> {
    let dex_config = client.dex().clone();
    let expected = client.quote_price(from, to, amount).await?;
    ensure_allowance(client, from, dex_config.router, amount).await?;
    let request = dex::swap_exact_in(
        &dex_config,
        from,
        to,
        amount,
        dex::min_out(expected, config.slippage_bps),
        recipient,
        deadline(config.swap_deadline_secs),
    );
    client.submit(request).await?;
    Ok(expected)
}

/// Unix timestamp `window_secs` from now.
pub(crate) fn deadline(window_secs: u64) -> u64 {
    let now = Utc::now().timestamp().max(0) as u64;
    now + window_secs
}
