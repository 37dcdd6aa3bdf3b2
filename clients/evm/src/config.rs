//! Configuration types for the chain client.

use std::time::Duration;

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use url::Url;

/// Fantom opera mainnet.
pub const FANTOM_CHAIN_ID: u64 = 250;

/// Addresses of the Uniswap V2 style exchange used for quotes, trades and liquidity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexConfig {
    /// Router contract (quotes, swaps, liquidity)
    pub router: Address,
    /// Factory contract (pair lookup)
    pub factory: Address,
    /// Wrapped native asset, used as the routing hop and as the native side of pairs
    pub wrapped_native: Address,
}

impl DexConfig {
    /// SpookySwap on Fantom.
    pub fn spookyswap() -> Self {
        Self {
            router: address!("F491e7B69E4244ad4002BC14e878a34207E38c29"),
            factory: address!("152eE697f2E276fA89E96742e9bB9aB1F2E61bE3"),
            wrapped_native: address!("21be370D5312f44cB42ce377BC9b8a0cEF1A4C83"),
        }
    }
}

/// Configuration for AlloyChainClient
#[derive(Debug, Clone)]
pub struct ChainClientConfig {
    /// HTTP RPC endpoint
    pub rpc_url: Url,
    /// Chain id stamped on every transaction
    pub chain_id: u64,
    /// Exchange used by `quote_price` and `pair_reserves`
    pub dex: DexConfig,
    /// How long to wait for a receipt before giving up on a transaction
    pub receipt_timeout: Duration,
    /// Extra attempts for a read that failed at the transport level
    pub read_retries: u32,
    /// Delay before the first retry; doubles on each further attempt
    pub retry_backoff: Duration,
}

impl ChainClientConfig {
    pub fn fantom(rpc_url: Url) -> Self {
        Self {
            rpc_url,
            chain_id: FANTOM_CHAIN_ID,
            dex: DexConfig::spookyswap(),
            receipt_timeout: Duration::from_secs(300),
            read_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}
