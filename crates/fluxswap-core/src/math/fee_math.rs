//! # Fee Math
//!
//! Fee-growth accounting in Q64.64: global per-unit-liquidity
//! accumulators, the fee growth inside a tick range, and the fees a
//! position is owed. Growth accumulators deliberately use wrapping
//! arithmetic — only differences between observations are meaningful.

use crate::errors::{CoreError, CoreResult};
use crate::math::big_int::{full_mul, U256};

/// Per-unit-liquidity fee growth contributed by a fee amount,
/// `fee * Q64 / liquidity`
pub fn fee_growth_from_fee(fee_amount: u64, liquidity: u128) -> CoreResult<u128> {
    if liquidity == 0 {
        return Err(CoreError::DivisionByZero);
    }
    let shifted = U256::new(0, fee_amount as u128)
        .checked_mul_u128(1u128 << 64)
        .ok_or(CoreError::Overflow)?;
    let (quotient, _) = shifted
        .div_rem(&U256::from_u128(liquidity))
        .ok_or(CoreError::DivisionByZero)?;
    quotient.to_u128().ok_or(CoreError::Overflow)
}

/// Fee growth inside a tick range, derived from the global accumulator
/// and the per-tick "outside" values
pub fn fee_growth_inside(
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    fee_growth_global_x64: u128,
    fee_growth_outside_lower_x64: u128,
    fee_growth_outside_upper_x64: u128,
) -> u128 {
    let below = if tick_current >= tick_lower {
        fee_growth_outside_lower_x64
    } else {
        fee_growth_global_x64.wrapping_sub(fee_growth_outside_lower_x64)
    };

    let above = if tick_current < tick_upper {
        fee_growth_outside_upper_x64
    } else {
        fee_growth_global_x64.wrapping_sub(fee_growth_outside_upper_x64)
    };

    fee_growth_global_x64.wrapping_sub(below).wrapping_sub(above)
}

/// Fees owed to a position since its last snapshot,
/// `liquidity * growth_delta / Q64`
pub fn fees_owed(
    liquidity: u128,
    fee_growth_inside_last_x64: u128,
    fee_growth_inside_now_x64: u128,
) -> CoreResult<u64> {
    let delta = fee_growth_inside_now_x64.wrapping_sub(fee_growth_inside_last_x64);
    let product = full_mul(liquidity, delta);
    let owed = U256::new(product.hi >> 64, product.hi << 64 | product.lo >> 64);
    owed.to_u64().ok_or(CoreError::Overflow)
}
