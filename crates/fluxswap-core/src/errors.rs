//! # Core Error Types
//!
//! Math-level failures surfaced by the pure calculation layer. Every
//! arithmetic overflow is reported, never wrapped.

use thiserror::Error;

/// Errors raised by the stateless math layer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    #[error("tick out of range")]
    OutOfRangeTick,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("sqrt price out of range")]
    OutOfRangePrice,

    #[error("invalid tick range")]
    InvalidTickRange,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,
}

/// Result type using core errors
pub type CoreResult<T> = Result<T, CoreError>;
