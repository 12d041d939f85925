//! # Swap Step Math
//!
//! Computes a single step of a swap within one tick range: how much input
//! is consumed, how much output is produced, and the fee charged, before
//! the price reaches a target boundary or the input is exhausted.

use crate::constants::BPS_DENOMINATOR;
use crate::errors::{CoreError, CoreResult};
use crate::math::big_int::{mul_div_u128, Rounding};
use crate::math::liquidity_math::{
    amount_a_delta, amount_b_delta, next_sqrt_price_from_a_in, next_sqrt_price_from_b_in,
};

/// Outcome of a single swap step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Price reached the target boundary with input left over
    ReachedTarget,
    /// The input amount was fully consumed inside the range
    ExhaustedInput,
}

/// Result of a single swap step
#[derive(Debug, Clone, Copy)]
pub struct SwapStep {
    /// Total input consumed, fee included
    pub amount_in: u64,
    /// Output produced
    pub amount_out: u64,
    /// Fee charged on this step's input
    pub fee_amount: u64,
    /// Sqrt price after the step
    pub sqrt_price_next_x64: u128,
    pub outcome: StepOutcome,
}

/// Compute one swap step toward a target sqrt price.
///
/// The direction is implied by the target: a target below the current
/// price consumes token A and produces token B, and vice versa. Fees are
/// deducted from the input; input amounts round up and output amounts
/// round down so the pool is never disadvantaged.
pub fn compute_swap_step(
    sqrt_price_current_x64: u128,
    sqrt_price_target_x64: u128,
    liquidity: u128,
    amount_remaining: u64,
    fee_bps: u16,
) -> CoreResult<SwapStep> {
    if liquidity == 0 {
        return Err(CoreError::InsufficientLiquidity);
    }
    let a_to_b = sqrt_price_target_x64 < sqrt_price_current_x64;

    // Net input available after reserving the fee on the full remainder.
    let max_net_in = mul_div_u128(
        amount_remaining as u128,
        (BPS_DENOMINATOR - fee_bps as u64) as u128,
        BPS_DENOMINATOR as u128,
        Rounding::Down,
    )? as u64;

    // Input needed to push the price all the way to the target.
    let in_to_target = if a_to_b {
        amount_a_delta(sqrt_price_target_x64, sqrt_price_current_x64, liquidity, true)?
    } else {
        amount_b_delta(sqrt_price_current_x64, sqrt_price_target_x64, liquidity, true)?
    };

    let (net_in, fee_amount, sqrt_price_next_x64, outcome) = if max_net_in >= in_to_target {
        // Fee is charged on the consumed net amount only.
        let fee = mul_div_u128(
            in_to_target as u128,
            fee_bps as u128,
            (BPS_DENOMINATOR - fee_bps as u64) as u128,
            Rounding::Up,
        )? as u64;
        (
            in_to_target,
            fee,
            sqrt_price_target_x64,
            StepOutcome::ReachedTarget,
        )
    } else {
        let next = if a_to_b {
            next_sqrt_price_from_a_in(sqrt_price_current_x64, liquidity, max_net_in)?
        } else {
            next_sqrt_price_from_b_in(sqrt_price_current_x64, liquidity, max_net_in)?
        };
        (
            max_net_in,
            amount_remaining - max_net_in,
            next,
            StepOutcome::ExhaustedInput,
        )
    };

    let amount_out = if a_to_b {
        amount_b_delta(sqrt_price_next_x64, sqrt_price_current_x64, liquidity, false)?
    } else {
        amount_a_delta(sqrt_price_current_x64, sqrt_price_next_x64, liquidity, false)?
    };

    let amount_in = net_in
        .checked_add(fee_amount)
        .ok_or(CoreError::Overflow)?
        .min(amount_remaining);

    Ok(SwapStep {
        amount_in,
        amount_out,
        fee_amount,
        sqrt_price_next_x64,
        outcome,
    })
}
