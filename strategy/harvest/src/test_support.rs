//! In-memory chain used by the harvester tests.
//!
//! Submitted calldata is decoded and applied to simple balance, allowance and
//! pending-reward maps, so tests observe the same effects a real chain would
//! produce for the calls the harvester makes.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy::primitives::{address, Address, B256, U256};
use async_trait::async_trait;
use evm::contracts::{IAnyswapRouter, IMasonry, IRewardPool, IUniswapV2Router02, IERC20};
use evm::{ChainClient, ChainError, DexConfig, PairReserves, TxReceipt, TxRequest, NATIVE};

use crate::config::{HarvestConfig, SettlementCurrency};
use crate::fork::{based_fork, Fork};

pub const WALLET: Address = address!("1111111111111111111111111111111111111111");
pub const PROFIT_WALLET: Address = address!("2222222222222222222222222222222222222222");
pub const LP_PAIR: Address = address!("3333333333333333333333333333333333333333");

/// 10^18, one whole shares token.
pub fn shares(whole: u64) -> U256 {
    utils::scale_units(whole, 18)
}

/// `n` whole USDC in raw units.
pub fn usdc(whole: u64) -> U256 {
    utils::scale_units(whole, 6)
}

pub fn usdc_currency() -> SettlementCurrency {
    SettlementCurrency::from_code("USDC").unwrap()
}

pub fn harvest_config() -> HarvestConfig {
    HarvestConfig::new(PROFIT_WALLET, usdc_currency())
}

pub fn plain_fork(pid: u64) -> Fork {
    based_fork(pid, None).unwrap()
}

pub fn compounding_fork(pid: u64) -> Fork {
    let wrapped = DexConfig::spookyswap().wrapped_native.to_string();
    based_fork(pid, Some(wrapped.as_str())).unwrap()
}

#[derive(Default)]
struct State {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    pending: HashMap<(Address, u64), (Address, U256)>,
    prices: HashMap<(Address, Address), (U256, U256)>,
    pairs: HashMap<(Address, Address), (Address, U256, U256)>,
    bridge_underlying: HashMap<Address, Address>,
    failing_targets: HashSet<Address>,
    failing_pools: HashSet<(Address, u64)>,
    submitted: Vec<TxRequest>,
}

pub struct MockChain {
    wallet: Address,
    dex: DexConfig,
    state: Mutex<State>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            wallet: WALLET,
            dex: DexConfig::spookyswap(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state().balances.insert((token, owner), amount);
    }

    pub fn balance(&self, token: Address, owner: Address) -> U256 {
        self.state()
            .balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_allowance(&self, token: Address, spender: Address, amount: U256) {
        self.state()
            .allowances
            .insert((token, self.wallet, spender), amount);
    }

    /// `reward_token` becomes claimable from `pool`/`pid` by the wallet.
    pub fn set_pending(&self, pool: Address, pid: u64, reward_token: Address, amount: U256) {
        self.state().pending.insert((pool, pid), (reward_token, amount));
    }

    /// One raw unit of `from` buys `num / den` raw units of `to`.
    pub fn set_price(&self, from: Address, to: Address, num: U256, den: U256) {
        self.state().prices.insert((from, to), (num, den));
    }

    pub fn set_pair(&self, a: Address, b: Address, pair: Address, reserve_a: U256, reserve_b: U256) {
        self.state().pairs.insert((a, b), (pair, reserve_a, reserve_b));
    }

    pub fn set_bridge_underlying(&self, any_token: Address, underlying: Address) {
        self.state().bridge_underlying.insert(any_token, underlying);
    }

    /// Every transaction sent to `target` fails before reaching the chain.
    pub fn fail_submissions_to(&self, target: Address) {
        self.state().failing_targets.insert(target);
    }

    pub fn fail_pending_reads(&self, pool: Address, pid: u64) {
        self.state().failing_pools.insert((pool, pid));
    }

    pub fn submitted(&self) -> Vec<TxRequest> {
        self.state().submitted.clone()
    }

    pub fn submitted_labels(&self) -> Vec<String> {
        self.state()
            .submitted
            .iter()
            .map(|r| r.label.clone())
            .collect()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn revert(label: &str) -> ChainError {
        ChainError::Reverted {
            label: label.to_string(),
            hash: B256::ZERO,
        }
    }

    fn apply(&self, state: &mut State, request: &TxRequest) -> Result<(), ChainError> {
        let wallet = self.wallet;
        let label = request.label.as_str();

        if let Some(call) = request.decode::<IERC20::approveCall>() {
            state
                .allowances
                .insert((request.to, wallet, call.spender), call.amount);
        } else if let Some(call) = request.decode::<IRewardPool::withdrawCall>() {
            let pid = call.pid.to::<u64>();
            let (token, amount) = state
                .pending
                .remove(&(request.to, pid))
                .ok_or_else(|| Self::revert(label))?;
            credit(state, token, wallet, amount);
        } else if let Some(call) = request.decode::<IRewardPool::depositCall>() {
            let lp = state
                .pairs
                .values()
                .map(|(pair, _, _)| *pair)
                .find(|pair| state.balances.get(&(*pair, wallet)).is_some_and(|b| *b >= call.amount))
                .ok_or_else(|| Self::revert(label))?;
            spend(state, lp, request.to, call.amount).map_err(|_| Self::revert(label))?;
        } else if let Some(call) = request.decode::<IMasonry::stakeCall>() {
            // Every masonry in these tests stakes BSHARE.
            let token = plain_fork(0).shares_token;
            spend(state, token, request.to, call.amount).map_err(|_| Self::revert(label))?;
        } else if let Some(call) = request.decode::<IUniswapV2Router02::swapExactTokensForTokensCall>() {
            let (from, to) = (call.path[0], *call.path.last().unwrap());
            self.swap(state, label, from, to, call.amountIn, call.amountOutMin, call.to)?;
        } else if let Some(call) = request.decode::<IUniswapV2Router02::swapExactTokensForETHCall>() {
            self.swap(state, label, call.path[0], NATIVE, call.amountIn, call.amountOutMin, call.to)?;
        } else if let Some(call) = request.decode::<IUniswapV2Router02::addLiquidityCall>() {
            spend(state, call.tokenA, self.dex.router, call.amountADesired)
                .map_err(|_| Self::revert(label))?;
            spend(state, call.tokenB, self.dex.router, call.amountBDesired)
                .map_err(|_| Self::revert(label))?;
            let pair = state
                .pairs
                .get(&(call.tokenA, call.tokenB))
                .or_else(|| state.pairs.get(&(call.tokenB, call.tokenA)))
                .map(|(pair, _, _)| *pair)
                .ok_or_else(|| Self::revert(label))?;
            credit(state, pair, call.to, call.amountADesired);
        } else if let Some(call) = request.decode::<IUniswapV2Router02::addLiquidityETHCall>() {
            let value = request.value.unwrap_or_default();
            spend(state, call.token, self.dex.router, call.amountTokenDesired)
                .map_err(|_| Self::revert(label))?;
            debit(state, NATIVE, wallet, value).map_err(|_| Self::revert(label))?;
            let pair = state
                .pairs
                .get(&(call.token, self.dex.wrapped_native))
                .map(|(pair, _, _)| *pair)
                .ok_or_else(|| Self::revert(label))?;
            credit(state, pair, call.to, call.amountTokenDesired);
        } else if let Some(call) = request.decode::<IAnyswapRouter::anySwapOutUnderlyingCall>() {
            let underlying = *state
                .bridge_underlying
                .get(&call.token)
                .ok_or_else(|| Self::revert(label))?;
            spend(state, underlying, request.to, call.amount).map_err(|_| Self::revert(label))?;
        } else {
            return Err(Self::revert(label));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn swap(
        &self,
        state: &mut State,
        label: &str,
        from: Address,
        to: Address,
        amount_in: U256,
        amount_out_min: U256,
        recipient: Address,
    ) -> Result<(), ChainError> {
        let out = price(state, from, to, amount_in).ok_or_else(|| Self::revert(label))?;
        if out < amount_out_min {
            return Err(Self::revert(label));
        }
        spend(state, from, self.dex.router, amount_in).map_err(|_| Self::revert(label))?;
        credit(state, to, recipient, out);
        Ok(())
    }
}

fn price(state: &State, from: Address, to: Address, amount: U256) -> Option<U256> {
    state
        .prices
        .get(&(from, to))
        .map(|(num, den)| amount * *num / *den)
}

fn credit(state: &mut State, token: Address, owner: Address, amount: U256) {
    *state.balances.entry((token, owner)).or_default() += amount;
}

fn debit(state: &mut State, token: Address, owner: Address, amount: U256) -> Result<(), ()> {
    let balance = state.balances.entry((token, owner)).or_default();
    if *balance < amount {
        return Err(());
    }
    *balance -= amount;
    Ok(())
}

/// `transferFrom` of the wallet's `token` by `spender`.
fn spend(state: &mut State, token: Address, spender: Address, amount: U256) -> Result<(), ()> {
    let allowance = state.allowances.entry((token, WALLET, spender)).or_default();
    if *allowance < amount {
        return Err(());
    }
    *allowance -= amount;
    debit(state, token, WALLET, amount)
}

#[async_trait]
impl ChainClient for MockChain {
    fn wallet(&self) -> Address {
        self.wallet
    }

    fn dex(&self) -> &DexConfig {
        &self.dex
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        Ok(self.balance(token, owner))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(self
            .state()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn pending_reward(
        &self,
        pool: Address,
        pid: u64,
        _owner: Address,
    ) -> Result<U256, ChainError> {
        let state = self.state();
        if state.failing_pools.contains(&(pool, pid)) {
            return Err(ChainError::read("pendingShare", "connection reset"));
        }
        Ok(state
            .pending
            .get(&(pool, pid))
            .map(|(_, amount)| *amount)
            .unwrap_or_default())
    }

    async fn quote_price(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<U256, ChainError> {
        price(&self.state(), from, to, amount).ok_or_else(|| ChainError::QuoteUnavailable {
            from,
            to,
            message: "no route".to_string(),
        })
    }

    async fn pair_reserves(&self, a: Address, b: Address) -> Result<PairReserves, ChainError> {
        let state = self.state();
        if let Some((pair, ra, rb)) = state.pairs.get(&(a, b)) {
            return Ok(PairReserves {
                pair: *pair,
                reserve_a: *ra,
                reserve_b: *rb,
            });
        }
        if let Some((pair, rb, ra)) = state.pairs.get(&(b, a)) {
            return Ok(PairReserves {
                pair: *pair,
                reserve_a: *ra,
                reserve_b: *rb,
            });
        }
        Err(ChainError::QuoteUnavailable {
            from: a,
            to: b,
            message: "no pair".to_string(),
        })
    }

    async fn submit(&self, request: TxRequest) -> Result<TxReceipt, ChainError> {
        let mut state = self.state();
        if state.failing_targets.contains(&request.to) {
            return Err(ChainError::transaction(&request.label, "signing failed"));
        }
        state.submitted.push(request.clone());
        self.apply(&mut state, &request)?;
        let n = state.submitted.len() as u8;
        Ok(TxReceipt {
            hash: B256::with_last_byte(n),
            block_number: Some(u64::from(n)),
            gas_used: 21_000,
        })
    }
}
