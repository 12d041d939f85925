//! Mathematical functions for the FluxSwap AMM.
//!
//! All settlement-path arithmetic is integer fixed-point; intermediate
//! products widen to 256 bits and overflow is always surfaced as an error.

pub mod big_int;
pub mod fee_math;
pub mod liquidity_math;
pub mod swap_math;
pub mod tick_math;

pub use big_int::{full_mul, mul_div_u128, Rounding, U256};
pub use swap_math::{compute_swap_step, StepOutcome, SwapStep};
