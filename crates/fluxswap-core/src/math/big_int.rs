//! Big integer operations for high-precision fixed-point math.
//!
//! Provides a two-word `U256` and the `mul_div` primitives the liquidity
//! and price formulas are built on.

use crate::errors::{CoreError, CoreResult};

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round down (towards zero)
    Down,
    /// Round up (away from zero)
    Up,
}

/// 256-bit unsigned integer for intermediate calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct U256 {
    /// High 128 bits
    pub hi: u128,
    /// Low 128 bits
    pub lo: u128,
}

impl U256 {
    pub const ZERO: U256 = U256 { hi: 0, lo: 0 };

    pub const fn new(hi: u128, lo: u128) -> Self {
        Self { hi, lo }
    }

    pub const fn from_u128(value: u128) -> Self {
        Self { hi: 0, lo: value }
    }

    pub const fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    /// Convert to u128, returning None on overflow
    pub fn to_u128(&self) -> Option<u128> {
        if self.hi == 0 {
            Some(self.lo)
        } else {
            None
        }
    }

    /// Convert to u64, returning None on overflow
    pub fn to_u64(&self) -> Option<u64> {
        if self.hi == 0 && self.lo <= u64::MAX as u128 {
            Some(self.lo as u64)
        } else {
            None
        }
    }

    pub fn checked_add(&self, other: &U256) -> Option<U256> {
        let (lo, carry) = self.lo.overflowing_add(other.lo);
        let hi = self.hi.checked_add(other.hi)?.checked_add(carry as u128)?;
        Some(U256::new(hi, lo))
    }

    pub fn checked_sub(&self, other: &U256) -> Option<U256> {
        if *self < *other {
            return None;
        }
        Some(self.wrapping_sub(other))
    }

    fn wrapping_sub(&self, other: &U256) -> U256 {
        let (lo, borrow) = self.lo.overflowing_sub(other.lo);
        let hi = self
            .hi
            .wrapping_sub(other.hi)
            .wrapping_sub(borrow as u128);
        U256::new(hi, lo)
    }

    /// Multiply by a u128, returning None if the product exceeds 256 bits
    pub fn checked_mul_u128(&self, m: u128) -> Option<U256> {
        let low = full_mul(self.lo, m);
        let high = full_mul(self.hi, m);
        if high.hi != 0 {
            return None;
        }
        let hi = low.hi.checked_add(high.lo)?;
        Some(U256::new(hi, low.lo))
    }

    fn bit(&self, i: u32) -> bool {
        if i >= 128 {
            self.hi >> (i - 128) & 1 == 1
        } else {
            self.lo >> i & 1 == 1
        }
    }

    fn set_bit(&mut self, i: u32) {
        if i >= 128 {
            self.hi |= 1u128 << (i - 128);
        } else {
            self.lo |= 1u128 << i;
        }
    }

    /// Long division; returns (quotient, remainder), or None for a zero
    /// divisor.
    pub fn div_rem(&self, divisor: &U256) -> Option<(U256, U256)> {
        if divisor.is_zero() {
            return None;
        }
        // Fast path when both operands fit in 128 bits.
        if self.hi == 0 && divisor.hi == 0 {
            return Some((
                U256::from_u128(self.lo / divisor.lo),
                U256::from_u128(self.lo % divisor.lo),
            ));
        }

        // Binary long division over 256 bits.
        let mut quotient = U256::ZERO;
        let mut remainder = U256::ZERO;
        for i in (0..256).rev() {
            let carry = remainder.hi >> 127 != 0;
            remainder.hi = remainder.hi << 1 | remainder.lo >> 127;
            remainder.lo <<= 1;
            if self.bit(i) {
                remainder.lo |= 1;
            }
            if carry || remainder >= *divisor {
                remainder = remainder.wrapping_sub(divisor);
                quotient.set_bit(i);
            }
        }
        Some((quotient, remainder))
    }
}

/// Multiply two u128 values into a full-width U256
pub fn full_mul(a: u128, b: u128) -> U256 {
    let a_lo = a as u64 as u128;
    let a_hi = a >> 64;
    let b_lo = b as u64 as u128;
    let b_hi = b >> 64;

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let (mid, mid_carry) = lh.overflowing_add(hl);
    let (lo, lo_carry) = ll.overflowing_add(mid << 64);
    let hi = hh
        + (mid >> 64)
        + ((mid_carry as u128) << 64)
        + lo_carry as u128;

    U256::new(hi, lo)
}

/// Compute `a * b / denominator` with full-width intermediates.
///
/// Fails with `Overflow` when the result does not fit in u128 and with
/// `DivisionByZero` for a zero denominator.
pub fn mul_div_u128(a: u128, b: u128, denominator: u128, rounding: Rounding) -> CoreResult<u128> {
    if denominator == 0 {
        return Err(CoreError::DivisionByZero);
    }
    let product = full_mul(a, b);
    let (quotient, remainder) = product
        .div_rem(&U256::from_u128(denominator))
        .ok_or(CoreError::DivisionByZero)?;

    let result = if rounding == Rounding::Up && !remainder.is_zero() {
        quotient
            .checked_add(&U256::from_u128(1))
            .ok_or(CoreError::Overflow)?
    } else {
        quotient
    };
    result.to_u128().ok_or(CoreError::Overflow)
}

/// Compute `a * b / denominator` where the numerator and denominator are
/// already wide. Used by the sqrt-price update formulas whose denominator
/// exceeds 128 bits.
pub fn mul_div_wide(a: U256, b: u128, denominator: U256, rounding: Rounding) -> CoreResult<U256> {
    if denominator.is_zero() {
        return Err(CoreError::DivisionByZero);
    }
    let product = a.checked_mul_u128(b).ok_or(CoreError::Overflow)?;
    let (quotient, remainder) = product
        .div_rem(&denominator)
        .ok_or(CoreError::DivisionByZero)?;

    if rounding == Rounding::Up && !remainder.is_zero() {
        quotient
            .checked_add(&U256::from_u128(1))
            .ok_or(CoreError::Overflow)
    } else {
        Ok(quotient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_basic_ops() {
        let a = U256::from_u128(100);
        let b = U256::from_u128(200);

        assert_eq!(a.checked_add(&b).unwrap().to_u128().unwrap(), 300);
        assert_eq!(b.checked_sub(&a).unwrap().to_u128().unwrap(), 100);
        assert!(a.checked_sub(&b).is_none());

        let (q, r) = b.div_rem(&a).unwrap();
        assert_eq!(q.to_u128().unwrap(), 2);
        assert!(r.is_zero());
    }

    #[test]
    fn test_full_mul_widening() {
        let product = full_mul(u128::MAX, u128::MAX);
        // (2^128 - 1)^2 = 2^256 - 2^129 + 1
        assert_eq!(product.lo, 1);
        assert_eq!(product.hi, u128::MAX - 1);
    }

    #[test]
    fn test_wide_division() {
        let product = full_mul(u128::MAX, 1000);
        let (q, r) = product.div_rem(&U256::from_u128(1000)).unwrap();
        assert_eq!(q.to_u128().unwrap(), u128::MAX);
        assert!(r.is_zero());

        // Divisor wider than 128 bits
        let divisor = U256::new(1, 0);
        let dividend = U256::new(5, 42);
        let (q, r) = dividend.div_rem(&divisor).unwrap();
        assert_eq!(q.to_u128().unwrap(), 5);
        assert_eq!(r.to_u128().unwrap(), 42);
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div_u128(10, 3, 4, Rounding::Down).unwrap(), 7);
        assert_eq!(mul_div_u128(10, 3, 4, Rounding::Up).unwrap(), 8);
        assert_eq!(mul_div_u128(10, 4, 5, Rounding::Up).unwrap(), 8);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(
            mul_div_u128(1, 1, 0, Rounding::Down),
            Err(CoreError::DivisionByZero)
        );
        assert_eq!(
            mul_div_u128(u128::MAX, u128::MAX, 1, Rounding::Down),
            Err(CoreError::Overflow)
        );
    }

    #[test]
    fn test_mul_div_large_numbers() {
        let a = u128::MAX / 2;
        assert_eq!(mul_div_u128(a, 2, 2, Rounding::Down).unwrap(), a);
    }
}
