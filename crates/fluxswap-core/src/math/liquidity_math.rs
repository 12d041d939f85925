//! # Liquidity Math
//!
//! Closed-form concentrated-liquidity formulas: token amount deltas for a
//! liquidity amount between two sqrt prices, liquidity from desired
//! amounts, and sqrt-price updates from swap input.
//!
//! Rounding always favors the pool: deposits and swap inputs round up,
//! withdrawals and swap outputs round down.

use crate::constants::Q64;
use crate::errors::{CoreError, CoreResult};
use crate::math::big_int::{full_mul, mul_div_u128, mul_div_wide, Rounding, U256};

/// Amount of token A between two sqrt prices for a liquidity amount.
///
/// `amount_a = L * (sqrt_upper - sqrt_lower) / (sqrt_upper * sqrt_lower)`
/// in Q64.64, computed as two divisions to keep intermediates in range.
pub fn amount_a_delta(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> CoreResult<u64> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == 0 {
        return Err(CoreError::DivisionByZero);
    }

    let rounding = if round_up { Rounding::Up } else { Rounding::Down };
    let numerator = U256::from_u128(liquidity)
        .checked_mul_u128(Q64)
        .ok_or(CoreError::Overflow)?;

    let interim = mul_div_wide(numerator, upper - lower, U256::from_u128(upper), rounding)?;
    let (quotient, remainder) = interim
        .div_rem(&U256::from_u128(lower))
        .ok_or(CoreError::DivisionByZero)?;
    let result = if round_up && !remainder.is_zero() {
        quotient
            .checked_add(&U256::from_u128(1))
            .ok_or(CoreError::Overflow)?
    } else {
        quotient
    };
    result.to_u64().ok_or(CoreError::Overflow)
}

/// Amount of token B between two sqrt prices for a liquidity amount.
///
/// `amount_b = L * (sqrt_upper - sqrt_lower) / Q64`
pub fn amount_b_delta(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> CoreResult<u64> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    let rounding = if round_up { Rounding::Up } else { Rounding::Down };
    mul_div_u128(liquidity, upper - lower, Q64, rounding)?
        .try_into()
        .map_err(|_| CoreError::Overflow)
}

/// Liquidity obtainable from an amount of token A over a price range
pub fn liquidity_for_amount_a(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    amount_a: u64,
) -> CoreResult<u128> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(CoreError::InvalidTickRange);
    }
    let intermediate = mul_div_u128(lower, upper, Q64, Rounding::Down)?;
    mul_div_u128(amount_a as u128, intermediate, upper - lower, Rounding::Down)
}

/// Liquidity obtainable from an amount of token B over a price range
pub fn liquidity_for_amount_b(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    amount_b: u64,
) -> CoreResult<u128> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(CoreError::InvalidTickRange);
    }
    mul_div_u128(amount_b as u128, Q64, upper - lower, Rounding::Down)
}

/// Liquidity satisfying both desired amounts without exceeding either.
///
/// Below the range all liquidity is denominated in token A, above in
/// token B; inside the range the conservative minimum of the two is used.
pub fn liquidity_for_amounts(
    sqrt_price_current_x64: u128,
    sqrt_price_lower_x64: u128,
    sqrt_price_upper_x64: u128,
    amount_a: u64,
    amount_b: u64,
) -> CoreResult<u128> {
    let (lower, upper) = sorted(sqrt_price_lower_x64, sqrt_price_upper_x64);

    if sqrt_price_current_x64 <= lower {
        liquidity_for_amount_a(lower, upper, amount_a)
    } else if sqrt_price_current_x64 < upper {
        let from_a = liquidity_for_amount_a(sqrt_price_current_x64, upper, amount_a)?;
        let from_b = liquidity_for_amount_b(lower, sqrt_price_current_x64, amount_b)?;
        Ok(from_a.min(from_b))
    } else {
        liquidity_for_amount_b(lower, upper, amount_b)
    }
}

/// Token amounts represented by a liquidity amount at the current price
pub fn amounts_for_liquidity(
    sqrt_price_current_x64: u128,
    sqrt_price_lower_x64: u128,
    sqrt_price_upper_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> CoreResult<(u64, u64)> {
    let (lower, upper) = sorted(sqrt_price_lower_x64, sqrt_price_upper_x64);

    if sqrt_price_current_x64 <= lower {
        Ok((amount_a_delta(lower, upper, liquidity, round_up)?, 0))
    } else if sqrt_price_current_x64 < upper {
        Ok((
            amount_a_delta(sqrt_price_current_x64, upper, liquidity, round_up)?,
            amount_b_delta(lower, sqrt_price_current_x64, liquidity, round_up)?,
        ))
    } else {
        Ok((0, amount_b_delta(lower, upper, liquidity, round_up)?))
    }
}

/// Next sqrt price after swapping in an amount of token A (price moves
/// down). Rounds up so the pool is never short.
///
/// `next = L * sqrt_p * Q64 / (L * Q64 + amount * sqrt_p)`
pub fn next_sqrt_price_from_a_in(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount_in: u64,
) -> CoreResult<u128> {
    if amount_in == 0 {
        return Ok(sqrt_price_x64);
    }
    if liquidity == 0 {
        return Err(CoreError::InsufficientLiquidity);
    }

    let numerator = full_mul(liquidity, sqrt_price_x64);
    let denominator = U256::from_u128(liquidity)
        .checked_mul_u128(Q64)
        .ok_or(CoreError::Overflow)?
        .checked_add(&full_mul(amount_in as u128, sqrt_price_x64))
        .ok_or(CoreError::Overflow)?;

    mul_div_wide(numerator, Q64, denominator, Rounding::Up)?
        .to_u128()
        .ok_or(CoreError::Overflow)
}

/// Next sqrt price after swapping in an amount of token B (price moves
/// up). Rounds down so the pool is never short.
///
/// `next = sqrt_p + amount * Q64 / L`
pub fn next_sqrt_price_from_b_in(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount_in: u64,
) -> CoreResult<u128> {
    if amount_in == 0 {
        return Ok(sqrt_price_x64);
    }
    if liquidity == 0 {
        return Err(CoreError::InsufficientLiquidity);
    }

    let quotient = mul_div_u128(amount_in as u128, Q64, liquidity, Rounding::Down)?;
    sqrt_price_x64.checked_add(quotient).ok_or(CoreError::Overflow)
}

fn sorted(a: u128, b: u128) -> (u128, u128) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick_math::sqrt_price_at_tick;

    #[test]
    fn test_amount_deltas_positive() {
        let lower = Q64;
        let upper = Q64 + Q64 / 100;
        let liquidity = 1_000_000u128;

        let amount_a = amount_a_delta(lower, upper, liquidity, false).unwrap();
        let amount_b = amount_b_delta(lower, upper, liquidity, false).unwrap();
        assert!(amount_a > 0);
        assert!(amount_b > 0);

        // Round-up never yields less than round-down.
        assert!(amount_a_delta(lower, upper, liquidity, true).unwrap() >= amount_a);
        assert!(amount_b_delta(lower, upper, liquidity, true).unwrap() >= amount_b);
    }

    #[test]
    fn test_liquidity_round_trips_conservatively() {
        let lower = sqrt_price_at_tick(-1000).unwrap();
        let upper = sqrt_price_at_tick(1000).unwrap();
        let current = Q64;

        let liquidity = liquidity_for_amounts(current, lower, upper, 500_000, 500_000).unwrap();
        let (amount_a, amount_b) =
            amounts_for_liquidity(current, lower, upper, liquidity, false).unwrap();

        // Withdrawing the computed liquidity never exceeds the deposits.
        assert!(amount_a <= 500_000);
        assert!(amount_b <= 500_000);
    }

    #[test]
    fn test_one_sided_ranges() {
        let lower = sqrt_price_at_tick(100).unwrap();
        let upper = sqrt_price_at_tick(200).unwrap();
        let liquidity = 1_000_000_000u128;

        // Current price below the range: all token A.
        let below = sqrt_price_at_tick(50).unwrap();
        let (a, b) = amounts_for_liquidity(below, lower, upper, liquidity, false).unwrap();
        assert!(a > 0);
        assert_eq!(b, 0);

        // Current price above the range: all token B.
        let above = sqrt_price_at_tick(250).unwrap();
        let (a, b) = amounts_for_liquidity(above, lower, upper, liquidity, false).unwrap();
        assert_eq!(a, 0);
        assert!(b > 0);
    }

    #[test]
    fn test_next_sqrt_price_direction() {
        let sqrt_price = Q64;
        let liquidity = 1_000_000u128;

        let down = next_sqrt_price_from_a_in(sqrt_price, liquidity, 100).unwrap();
        assert!(down < sqrt_price);

        let up = next_sqrt_price_from_b_in(sqrt_price, liquidity, 100).unwrap();
        assert!(up > sqrt_price);
    }

    #[test]
    fn test_zero_liquidity_rejected() {
        assert_eq!(
            next_sqrt_price_from_a_in(Q64, 0, 100),
            Err(CoreError::InsufficientLiquidity)
        );
        assert_eq!(
            next_sqrt_price_from_b_in(Q64, 0, 100),
            Err(CoreError::InsufficientLiquidity)
        );
    }
}
