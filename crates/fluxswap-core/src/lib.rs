//! # FluxSwap Core - Pure Protocol Math and Types
//!
//! This crate contains the stateless math and value types shared by the
//! FluxSwap engines. It provides:
//!
//! - Q64.64 fixed-point tick and price conversions
//! - Concentrated-liquidity amount and fee-growth formulas
//! - Per-step swap math with explicit rounding direction
//! - Value objects (tokens, pools, positions, quotes, proposals)
//!
//! Nothing in this crate performs I/O or holds mutable state; every
//! function is deterministic in its inputs.

pub mod constants;
pub mod errors;
pub mod math;
pub mod types;

pub use constants::*;
pub use errors::{CoreError, CoreResult};
pub use types::*;
