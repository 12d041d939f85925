//! # Tick Math
//!
//! Conversions between ticks and sqrt prices using Q64.64 fixed-point
//! precision. A tick `t` maps to `sqrt(1.0001)^t * 2^64`; the inverse is
//! floor-rounded, so a price exactly on a tick boundary belongs to that
//! (higher) tick.

use crate::constants::{MAX_SQRT_PRICE_X64, MAX_TICK, MIN_SQRT_PRICE_X64, MIN_TICK, Q64};
use crate::errors::{CoreError, CoreResult};
use crate::math::big_int::full_mul;

/// Pre-computed values of sqrt(1.0001)^(2^i) in Q64.64 format, covering
/// every bit of `MAX_TICK`
const SQRT_1_0001_POW_2: [u128; 19] = [
    18_447_666_387_855_959_851,         // 2^0
    18_448_588_748_116_922_571,         // 2^1
    18_450_433_606_991_734_263,         // 2^2
    18_454_123_878_217_468_680,         // 2^3
    18_461_506_635_090_006_702,         // 2^4
    18_476_281_010_653_910_145,         // 2^5
    18_505_865_242_158_250_042,         // 2^6
    18_565_175_891_880_433_523,         // 2^7
    18_684_368_066_214_940_583,         // 2^8
    18_925_053_041_275_764_672,         // 2^9
    19_415_764_168_677_886_927,         // 2^10
    20_435_687_552_633_177_495,         // 2^11
    22_639_080_592_224_303_007,         // 2^12
    27_784_196_929_998_399_742,         // 2^13
    41_848_122_137_994_986_129,         // 2^14
    94_936_283_578_220_370_716,         // 2^15
    488_590_176_327_622_479_861,        // 2^16
    12_941_056_668_319_229_769_860,     // 2^17
    9_078_618_265_828_848_800_676_189,  // 2^18
];

/// Get the sqrt price at a tick.
///
/// Binary decomposition of the exponent over the pre-computed powers;
/// fails with `OutOfRangeTick` outside `[MIN_TICK, MAX_TICK]`.
pub fn sqrt_price_at_tick(tick: i32) -> CoreResult<u128> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(CoreError::OutOfRangeTick);
    }

    let abs_tick = tick.unsigned_abs();
    let mut ratio = Q64;
    for (i, pow) in SQRT_1_0001_POW_2.iter().enumerate() {
        if abs_tick & (1 << i) != 0 {
            ratio = mul_shift(ratio, *pow);
        }
    }

    if tick < 0 {
        // reciprocal: Q64^2 / ratio; ratio >= Q64 here so this cannot
        // divide by zero
        let squared = full_mul(Q64, Q64);
        let (quotient, _) = squared
            .div_rem(&crate::math::big_int::U256::from_u128(ratio))
            .ok_or(CoreError::DivisionByZero)?;
        ratio = quotient.to_u128().ok_or(CoreError::Overflow)?;
    }

    Ok(ratio)
}

/// Get the tick whose price range contains a sqrt price (floor semantics).
///
/// Exact round trip with `sqrt_price_at_tick`; a price equal to a tick
/// boundary maps to that tick. Fails with `OutOfRangePrice` outside the
/// representable bounds.
pub fn tick_at_sqrt_price(sqrt_price_x64: u128) -> CoreResult<i32> {
    if !(MIN_SQRT_PRICE_X64..=MAX_SQRT_PRICE_X64).contains(&sqrt_price_x64) {
        return Err(CoreError::OutOfRangePrice);
    }

    // sqrt_price_at_tick is strictly increasing, so binary search yields
    // the greatest tick whose price does not exceed the input.
    let mut low = MIN_TICK;
    let mut high = MAX_TICK;
    while low <= high {
        let mid = low + (high - low) / 2;
        let mid_price = sqrt_price_at_tick(mid)?;
        if mid_price == sqrt_price_x64 {
            return Ok(mid);
        } else if mid_price < sqrt_price_x64 {
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }
    Ok(high)
}

/// Check whether a tick is within the supported range
pub fn is_tick_valid(tick: i32) -> bool {
    (MIN_TICK..=MAX_TICK).contains(&tick)
}

/// Multiply two Q64.64 values, shifting the product back down
fn mul_shift(a: u128, b: u128) -> u128 {
    let product = full_mul(a, b);
    product.hi << 64 | product.lo >> 64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tick_zero_is_unit_price() {
        assert_eq!(sqrt_price_at_tick(0).unwrap(), Q64);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(sqrt_price_at_tick(MIN_TICK).unwrap(), MIN_SQRT_PRICE_X64);
        assert_eq!(sqrt_price_at_tick(MAX_TICK).unwrap(), MAX_SQRT_PRICE_X64);
        assert_eq!(
            sqrt_price_at_tick(MIN_TICK - 1),
            Err(CoreError::OutOfRangeTick)
        );
        assert_eq!(
            sqrt_price_at_tick(MAX_TICK + 1),
            Err(CoreError::OutOfRangeTick)
        );
    }

    #[test]
    fn test_round_trip_known_ticks() {
        for tick in [MIN_TICK, -200_311, -1000, -1, 0, 1, 1000, 200_311, MAX_TICK] {
            let sqrt_price = sqrt_price_at_tick(tick).unwrap();
            assert_eq!(tick_at_sqrt_price(sqrt_price).unwrap(), tick);
        }
    }

    #[test]
    fn test_boundary_belongs_to_higher_tick() {
        // A price exactly on the boundary of tick 100 maps to tick 100,
        // one below maps to tick 99.
        let boundary = sqrt_price_at_tick(100).unwrap();
        assert_eq!(tick_at_sqrt_price(boundary).unwrap(), 100);
        assert_eq!(tick_at_sqrt_price(boundary - 1).unwrap(), 99);
    }

    #[test]
    fn test_price_out_of_range() {
        assert_eq!(
            tick_at_sqrt_price(MIN_SQRT_PRICE_X64 - 1),
            Err(CoreError::OutOfRangePrice)
        );
        assert_eq!(
            tick_at_sqrt_price(MAX_SQRT_PRICE_X64 + 1),
            Err(CoreError::OutOfRangePrice)
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(tick in MIN_TICK..=MAX_TICK) {
            let sqrt_price = sqrt_price_at_tick(tick).unwrap();
            prop_assert_eq!(tick_at_sqrt_price(sqrt_price).unwrap(), tick);
        }

        #[test]
        fn prop_monotonic(tick in MIN_TICK..MAX_TICK) {
            prop_assert!(
                sqrt_price_at_tick(tick).unwrap() < sqrt_price_at_tick(tick + 1).unwrap()
            );
        }
    }
}
