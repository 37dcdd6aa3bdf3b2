//! Configuration types for the harvester.

use alloy::primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fork::parse_address;

/// Anyswap router on Fantom.
pub const ANYSWAP_ROUTER: Address = address!("1CcCA1cE62c62F7Be95d4A67722a8fDbed6EEcb4");

/// Currency profits are sold into and bridged out as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementCurrency {
    /// Ticker used in the run log, e.g. "USDC"
    pub code: String,
    /// ERC20 token on the harvesting chain
    pub token: Address,
    pub decimals: u8,
    /// Anyswap anyToken wrapping `token`, used when bridging
    pub bridge_token: Address,
}

impl SettlementCurrency {
    /// Looks up a supported currency by ticker.
    pub fn from_code(code: &str) -> Result<Self, ConfigError> {
        match code.to_ascii_uppercase().as_str() {
            "USDC" => Ok(Self {
                code: "USDC".to_string(),
                token: address!("04068DA6C83AFCFA0e13ba15A6696662335D5B75"),
                decimals: 6,
                bridge_token: address!("95bf7E307BC1ab0BA38ae10fc27084bC36FcD605"),
            }),
            _ => Err(ConfigError::UnknownCurrency(code.to_string())),
        }
    }
}

/// Run parameters for `Harvester`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Pending rewards must be worth strictly more than this many whole settlement units
    pub pool_minimum: u64,
    /// Percentage (0..=100) of each harvest sold for profit; 0 stakes everything
    pub take_profit_pct: u8,
    /// Final destination of profits
    pub profit_wallet: Address,
    /// Chain id profits are bridged to; 0 disables bridging
    pub profit_chain: u64,
    pub settlement: SettlementCurrency,
    /// Router performing the bridge call
    pub bridge_router: Address,
    /// Slippage tolerance applied to trades and liquidity adds; `None` accepts any output
    pub slippage_bps: Option<u32>,
    /// Seconds a swap stays valid after submission
    pub swap_deadline_secs: u64,
    /// Seconds a liquidity add stays valid after submission
    pub liquidity_deadline_secs: u64,
}

impl HarvestConfig {
    pub fn new(profit_wallet: Address, settlement: SettlementCurrency) -> Self {
        Self {
            pool_minimum: 100,
            take_profit_pct: 0,
            profit_wallet,
            profit_chain: 137,
            settlement,
            bridge_router: ANYSWAP_ROUTER,
            slippage_bps: None,
            swap_deadline_secs: 600,
            liquidity_deadline_secs: 3_600,
        }
    }

    /// `pool_minimum` in raw settlement-token units.
    pub fn pool_minimum_raw(&self) -> U256 {
        utils::scale_units(self.pool_minimum, self.settlement.decimals)
    }

    pub fn bridging_enabled(&self) -> bool {
        self.profit_chain != 0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.take_profit_pct > 100 {
            return Err(ConfigError::Invalid(format!(
                "take-profit percentage {} exceeds 100",
                self.take_profit_pct
            )));
        }
        if self.profit_wallet.is_zero() {
            return Err(ConfigError::Invalid("profit wallet is the zero address".into()));
        }
        Ok(())
    }
}

/// Secrets and endpoints read from the environment.
#[derive(Clone)]
pub struct EnvSettings {
    /// Wallet that holds the farm positions (`ADDRESS`)
    pub wallet: Address,
    /// Hex private key of `wallet` (`PRIVATE_KEY`)
    pub private_key: String,
    /// Default profit destination (`PROFIT_WALLET`)
    pub profit_wallet: Option<Address>,
    /// RPC endpoint (`PROVIDER`)
    pub provider_url: String,
}

impl std::fmt::Debug for EnvSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSettings")
            .field("wallet", &self.wallet)
            .field("private_key", &"<redacted>")
            .field("profit_wallet", &self.profit_wallet)
            .field("provider_url", &self.provider_url)
            .finish()
    }
}

impl EnvSettings {
    /// Reads settings through `lookup`, failing fast on anything missing or malformed.
    pub fn load<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingEnv(name))
        };
        let wallet = parse_address("ADDRESS", &required("ADDRESS")?)?;
        let private_key = required("PRIVATE_KEY")?;
        let provider_url = required("PROVIDER")?;
        let profit_wallet = lookup("PROFIT_WALLET")
            .filter(|v| !v.trim().is_empty())
            .map(|v| parse_address("PROFIT_WALLET", &v))
            .transpose()?;
        Ok(Self {
            wallet,
            private_key: private_key.trim().to_string(),
            profit_wallet,
            provider_url: provider_url.trim().to_string(),
        })
    }

    pub fn from_process() -> Result<Self, ConfigError> {
        Self::load(|name| std::env::var(name).ok())
    }
}
