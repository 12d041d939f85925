//! # Protocol Constants
//!
//! Fundamental constants for the FluxSwap AMM:
//! - Q64.64 fixed-point scale factors
//! - Tick and sqrt price bounds
//! - Fee structure and slippage limits
//! - Swap execution limits

/// Q64 fixed-point scale factor: 2^64
pub const Q64: u128 = 1u128 << 64;

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Minimum tick supported by the price curve.
///
/// Bounded so that `sqrt(1.0001)^tick * 2^64` stays inside `u128` for
/// every valid tick.
pub const MIN_TICK: i32 = -443_636;

/// Maximum tick supported by the price curve
pub const MAX_TICK: i32 = 443_636;

/// Sqrt price at `MIN_TICK` in Q64.64 format
pub const MIN_SQRT_PRICE_X64: u128 = 4_295_048_016;

/// Sqrt price at `MAX_TICK` in Q64.64 format
pub const MAX_SQRT_PRICE_X64: u128 = 79_226_673_515_401_279_988_681_420_430;

/// Minimum fee tier (0.01%)
pub const MIN_FEE_BPS: u16 = 1;

/// Maximum fee tier (10%)
pub const MAX_FEE_BPS: u16 = 1_000;

/// Maximum slippage tolerance callers may request (50%)
pub const MAX_SLIPPAGE_BPS: u64 = 5_000;

/// Default slippage tolerance (1%)
pub const DEFAULT_SLIPPAGE_BPS: u16 = 100;

/// Maximum number of steps in a single swap walk.
///
/// Bounds the work per swap; a request that would walk further fails
/// with `InsufficientLiquidity` rather than looping.
pub const MAX_SWAP_STEPS: u16 = 256;

/// Seconds per governance voting day
pub const SECONDS_PER_DAY: i64 = 86_400;
