//! Shared utilities for the harvester workspace.

use alloy::primitives::U256;

/// Formats a raw token amount as a fixed-point decimal string with `decimals` places.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let (integer, frac) = value.div_rem(divisor);
    format!("{}.{:0>width$}", integer, frac, width = decimals as usize)
}

/// Raw amount of `whole` units of a token with `decimals` decimals.
pub fn scale_units(whole: u64, decimals: u8) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(decimals))
}
