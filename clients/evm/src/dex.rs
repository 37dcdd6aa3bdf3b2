//! Uniswap V2 router helpers: routing paths, reserve math and call builders.

use alloy::primitives::{Address, U256};

use crate::config::DexConfig;
use crate::contracts::{IAnyswapRouter, IERC20, IMasonry, IRewardPool, IUniswapV2Router02};
use crate::tx::TxRequest;

/// Sentinel address standing for the chain's native asset.
pub const NATIVE: Address = Address::ZERO;

const BPS: u64 = 10_000;

/// Reserves of a pair, oriented to the order the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReserves {
    /// The pair (LP token) contract
    pub pair: Address,
    pub reserve_a: U256,
    pub reserve_b: U256,
}

/// Router path from `from` to `to`.
///
/// Pairs touching the wrapped native asset are traded directly; everything
/// else hops through wrapped native. `NATIVE` is replaced by wrapped native.
pub fn swap_path(dex: &DexConfig, from: Address, to: Address) -> Vec<Address> {
    let wrap = |a: Address| if a == NATIVE { dex.wrapped_native } else { a };
    let (from, to) = (wrap(from), wrap(to));
    if from == dex.wrapped_native || to == dex.wrapped_native {
        vec![from, to]
    } else {
        vec![from, dex.wrapped_native, to]
    }
}

/// Amount of B worth `amount_a` of A at the pair's current reserves (router `quote`).
pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> U256 {
    if reserve_a.is_zero() {
        return U256::ZERO;
    }
    amount_a * reserve_b / reserve_a
}

/// Minimum accepted output for `expected` given an optional slippage tolerance.
///
/// No tolerance means no floor at all.
pub fn min_out(expected: U256, slippage_bps: Option<u32>) -> U256 {
    match slippage_bps {
        Some(bps) => {
            let bps = U256::from(u64::from(bps).min(BPS));
            expected * (U256::from(BPS) - bps) / U256::from(BPS)
        }
        None => U256::ZERO,
    }
}

pub fn approve(token: Address, spender: Address, amount: U256) -> TxRequest {
    TxRequest::call("approve", token, &IERC20::approveCall { spender, amount })
}

/// Harvests pending rewards by withdrawing nothing from the pool.
pub fn harvest(reward_pool: Address, pid: u64) -> TxRequest {
    TxRequest::call(
        "withdraw",
        reward_pool,
        &IRewardPool::withdrawCall {
            pid: U256::from(pid),
            amount: U256::ZERO,
        },
    )
}

pub fn deposit(reward_pool: Address, pid: u64, amount: U256) -> TxRequest {
    TxRequest::call(
        "deposit",
        reward_pool,
        &IRewardPool::depositCall {
            pid: U256::from(pid),
            amount,
        },
    )
}

pub fn stake(masonry: Address, amount: U256) -> TxRequest {
    TxRequest::call("stake", masonry, &IMasonry::stakeCall { amount })
}

/// Swap of an exact input amount; ends in native when `to_token` is `NATIVE`.
pub fn swap_exact_in(
    dex: &DexConfig,
    from_token: Address,
    to_token: Address,
    amount_in: U256,
    amount_out_min: U256,
    recipient: Address,
    deadline: u64,
) -> TxRequest {
    let path = swap_path(dex, from_token, to_token);
    let deadline = U256::from(deadline);
    if to_token == NATIVE {
        TxRequest::call(
            "swap",
            dex.router,
            &IUniswapV2Router02::swapExactTokensForETHCall {
                amountIn: amount_in,
                amountOutMin: amount_out_min,
                path,
                to: recipient,
                deadline,
            },
        )
    } else {
        TxRequest::call(
            "swap",
            dex.router,
            &IUniswapV2Router02::swapExactTokensForTokensCall {
                amountIn: amount_in,
                amountOutMin: amount_out_min,
                path,
                to: recipient,
                deadline,
            },
        )
    }
}

/// One leg of a liquidity add: token, desired amount and accepted minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityLeg {
    pub token: Address,
    pub desired: U256,
    pub min: U256,
}

/// Liquidity add; uses `addLiquidityETH` with attached value when `b.token` is `NATIVE`.
pub fn add_liquidity(
    dex: &DexConfig,
    a: LiquidityLeg,
    b: LiquidityLeg,
    recipient: Address,
    deadline: u64,
) -> TxRequest {
    let deadline = U256::from(deadline);
    if b.token == NATIVE {
        TxRequest::call(
            "add_liquidity",
            dex.router,
            &IUniswapV2Router02::addLiquidityETHCall {
                token: a.token,
                amountTokenDesired: a.desired,
                amountTokenMin: a.min,
                amountETHMin: b.min,
                to: recipient,
                deadline,
            },
        )
        .with_value(b.desired)
    } else {
        TxRequest::call(
            "add_liquidity",
            dex.router,
            &IUniswapV2Router02::addLiquidityCall {
                tokenA: a.token,
                tokenB: b.token,
                amountADesired: a.desired,
                amountBDesired: b.desired,
                amountAMin: a.min,
                amountBMin: b.min,
                to: recipient,
                deadline,
            },
        )
    }
}

/// Bridges `amount` of the anyToken's underlying to `recipient` on `chain_id`.
pub fn bridge_out(
    bridge_router: Address,
    any_token: Address,
    recipient: Address,
    amount: U256,
    chain_id: u64,
) -> TxRequest {
    TxRequest::call(
        "bridge",
        bridge_router,
        &IAnyswapRouter::anySwapOutUnderlyingCall {
            token: any_token,
            to: recipient,
            amount,
            toChainID: U256::from(chain_id),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const SHARE: Address = address!("49C290Ff692149A4E16611c694fdED42C954ab7a");
    const USDC: Address = address!("04068DA6C83AFCFA0e13ba15A6696662335D5B75");

    #[test]
    fn path_hops_through_wrapped_native() {
        let dex = DexConfig::spookyswap();
        assert_eq!(
            swap_path(&dex, SHARE, USDC),
            vec![SHARE, dex.wrapped_native, USDC]
        );
        assert_eq!(swap_path(&dex, SHARE, NATIVE), vec![SHARE, dex.wrapped_native]);
        assert_eq!(
            swap_path(&dex, dex.wrapped_native, USDC),
            vec![dex.wrapped_native, USDC]
        );
    }

    #[test]
    fn quote_is_proportional_to_reserves() {
        assert_eq!(
            quote(U256::from(10), U256::from(1_000), U256::from(250)),
            U256::from(2)
        );
        assert_eq!(quote(U256::from(10), U256::ZERO, U256::from(250)), U256::ZERO);
    }

    #[test]
    fn min_out_without_tolerance_is_zero() {
        assert_eq!(min_out(U256::from(1_000), None), U256::ZERO);
        assert_eq!(min_out(U256::from(1_000), Some(50)), U256::from(995));
        assert_eq!(min_out(U256::from(1_000), Some(20_000)), U256::ZERO);
    }

    #[test]
    fn native_leg_attaches_value() {
        let dex = DexConfig::spookyswap();
        let wallet = address!("1111111111111111111111111111111111111111");
        let request = add_liquidity(
            &dex,
            LiquidityLeg {
                token: SHARE,
                desired: U256::from(100),
                min: U256::ZERO,
            },
            LiquidityLeg {
                token: NATIVE,
                desired: U256::from(40),
                min: U256::ZERO,
            },
            wallet,
            1_000,
        );
        assert_eq!(request.value, Some(U256::from(40)));
        let call = request
            .decode::<IUniswapV2Router02::addLiquidityETHCall>()
            .expect("addLiquidityETH calldata");
        assert_eq!(call.token, SHARE);
        assert_eq!(call.amountTokenDesired, U256::from(100));
        assert_eq!(call.deadline, U256::from(1_000));
    }
}
