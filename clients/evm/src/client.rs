//! The chain client seam and its alloy-backed implementation.

use std::future::Future;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{
    DynProvider, PendingTransactionError, Provider, ProviderBuilder, WatchTxError,
};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{ChainClientConfig, DexConfig};
use crate::contracts::{IRewardPool, IUniswapV2Factory, IUniswapV2Pair, IUniswapV2Router02, IERC20};
use crate::dex::{self, PairReserves, NATIVE};
use crate::error::ChainError;
use crate::tx::{build_transaction, TxReceipt, TxRequest};

/// Every read and write the harvester performs goes through this trait.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The wallet that signs transactions.
    fn wallet(&self) -> Address;

    /// The exchange used for quotes and liquidity.
    fn dex(&self) -> &DexConfig;

    /// ERC20 balance of `owner`; native balance when `token` is `NATIVE`.
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;

    /// Rewards accrued in `pool` for `owner` on pool `pid` and not yet claimed.
    async fn pending_reward(
        &self,
        pool: Address,
        pid: u64,
        owner: Address,
    ) -> Result<U256, ChainError>;

    /// Output amount of `to` for selling `amount` of `from`. Read only.
    async fn quote_price(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<U256, ChainError>;

    /// Pair contract and reserves for `a`/`b`, oriented as asked.
    async fn pair_reserves(&self, a: Address, b: Address) -> Result<PairReserves, ChainError>;

    /// Signs and broadcasts `request`, then waits until it is mined.
    ///
    /// A receipt only proves inclusion in a block. Callers check the effect
    /// they wanted by reading state again.
    async fn submit(&self, request: TxRequest) -> Result<TxReceipt, ChainError>;
}

/// Why a read failed, and whether trying again could help.
struct ReadFailure {
    retryable: bool,
    message: String,
}

impl From<TransportError> for ReadFailure {
    fn from(err: TransportError) -> Self {
        Self {
            retryable: !err.is_error_resp(),
            message: err.to_string(),
        }
    }
}

impl From<alloy::contract::Error> for ReadFailure {
    fn from(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(err) => err.into(),
            other => Self {
                retryable: false,
                message: other.to_string(),
            },
        }
    }
}

/// `ChainClient` over an HTTP provider with a local private-key wallet.
pub struct AlloyChainClient {
    provider: DynProvider,
    wallet: Address,
    config: ChainClientConfig,
}

impl AlloyChainClient {
    /// Creates a new `AlloyChainClient` signing with `signer`
    ///
    /// No network call is made until the first read.
    ///
    /// # Arguments
    /// * `config` - RPC endpoint, chain id, exchange addresses and the retry and receipt timeouts
    /// * `signer` - Local key that signs every submitted transaction; its address becomes `wallet()`
    ///
    /// # Returns
    /// A new `AlloyChainClient` over an HTTP provider with the signer installed as its wallet
    pub fn new(config: ChainClientConfig, signer: PrivateKeySigner) -> Self {
        let wallet = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(config.rpc_url.clone())
            .erased();
        Self {
            provider,
            wallet,
            config,
        }
    }

    /// Runs `op`, retrying transport failures with doubling backoff.
    async fn read<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ReadFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReadFailure>>,
    {
        let mut delay = self.config.retry_backoff;
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.retryable && attempt < self.config.read_retries => {
                    attempt += 1;
                    warn!(what, attempt, error = %err.message, "read failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn wallet(&self) -> Address {
        self.wallet
    }

    fn dex(&self) -> &DexConfig {
        &self.config.dex
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        if token == NATIVE {
            return self
                .read("native_balance", || async {
                    Ok(self.provider.get_balance(owner).await?)
                })
                .await
                .map_err(|e| ChainError::read("native_balance", e.message));
        }
        let erc20 = IERC20::new(token, &self.provider);
        self.read("balanceOf", || async { Ok(erc20.balanceOf(owner).call().await?) })
            .await
            .map_err(|e| ChainError::read(format!("balanceOf({token})"), e.message))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        let erc20 = IERC20::new(token, &self.provider);
        self.read("allowance", || async {
            Ok(erc20.allowance(owner, spender).call().await?)
        })
        .await
        .map_err(|e| ChainError::read(format!("allowance({token})"), e.message))
    }

    async fn pending_reward(
        &self,
        pool: Address,
        pid: u64,
        owner: Address,
    ) -> Result<U256, ChainError> {
        let reward_pool = IRewardPool::new(pool, &self.provider);
        self.read("pendingShare", || async {
            Ok(reward_pool
                .pendingShare(U256::from(pid), owner)
                .call()
                .await?)
        })
        .await
        .map_err(|e| ChainError::read(format!("pendingShare({pool}, {pid})"), e.message))
    }

    async fn quote_price(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<U256, ChainError> {
        let path = dex::swap_path(&self.config.dex, from, to);
        let router = IUniswapV2Router02::new(self.config.dex.router, &self.provider);
        let amounts = self
            .read("getAmountsOut", || async {
                Ok(router.getAmountsOut(amount, path.clone()).call().await?)
            })
            .await
            .map_err(|e| ChainError::QuoteUnavailable {
                from,
                to,
                message: e.message,
            })?;
        amounts
            .last()
            .copied()
            .ok_or_else(|| ChainError::QuoteUnavailable {
                from,
                to,
                message: "router returned no amounts".to_string(),
            })
    }

    async fn pair_reserves(&self, a: Address, b: Address) -> Result<PairReserves, ChainError> {
        let wrap = |t: Address| {
            if t == NATIVE {
                self.config.dex.wrapped_native
            } else {
                t
            }
        };
        let (a, b) = (wrap(a), wrap(b));
        let factory = IUniswapV2Factory::new(self.config.dex.factory, &self.provider);
        let pair = self
            .read("getPair", || async { Ok(factory.getPair(a, b).call().await?) })
            .await
            .map_err(|e| ChainError::read("getPair", e.message))?;
        if pair.is_zero() {
            return Err(ChainError::QuoteUnavailable {
                from: a,
                to: b,
                message: "no pair".to_string(),
            });
        }

        let pair_contract = IUniswapV2Pair::new(pair, &self.provider);
        let token0 = self
            .read("token0", || async { Ok(pair_contract.token0().call().await?) })
            .await
            .map_err(|e| ChainError::read("token0", e.message))?;
        let reserves = self
            .read("getReserves", || async {
                Ok(pair_contract.getReserves().call().await?)
            })
            .await
            .map_err(|e| ChainError::read("getReserves", e.message))?;

        let reserve0 = U256::from(reserves.reserve0.to::<u128>());
        let reserve1 = U256::from(reserves.reserve1.to::<u128>());
        let (reserve_a, reserve_b) = if token0 == a {
            (reserve0, reserve1)
        } else {
            (reserve1, reserve0)
        };
        Ok(PairReserves {
            pair,
            reserve_a,
            reserve_b,
        })
    }

    async fn submit(&self, request: TxRequest) -> Result<TxReceipt, ChainError> {
        let label = request.label.clone();
        let nonce = self
            .provider
            .get_transaction_count(self.wallet)
            .await
            .map_err(|e| ChainError::transaction(&label, format!("nonce lookup: {e}")))?;

        let tx = build_transaction(&request, self.wallet, nonce, self.config.chain_id);
        debug!(label = %label, to = %request.to, nonce, "submitting transaction");

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::transaction(&label, e))?;
        let hash = *pending.tx_hash();

        let receipt = pending
            .with_timeout(Some(self.config.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| watch_error(&label, hash, e))?;

        let confirmed = mined(
            label,
            receipt.status(),
            TxReceipt {
                hash,
                block_number: receipt.block_number,
                gas_used: receipt.gas_used,
            },
        )?;
        info!(label = %request.label, tx = %hash, block = ?confirmed.block_number, "transaction mined");
        Ok(confirmed)
    }
}

/// Maps a failed receipt wait to `Timeout` or `Transaction`.
fn watch_error(label: &str, hash: B256, err: PendingTransactionError) -> ChainError {
    match err {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => ChainError::Timeout {
            label: label.to_string(),
            hash,
        },
        other => ChainError::transaction(label, other),
    }
}

/// A mined receipt, or `Reverted` when its status is failure.
fn mined(label: String, success: bool, receipt: TxReceipt) -> Result<TxReceipt, ChainError> {
    if success {
        Ok(receipt)
    } else {
        Err(ChainError::Reverted {
            label,
            hash: receipt.hash,
        })
    }
}
