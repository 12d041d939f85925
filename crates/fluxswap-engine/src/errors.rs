//! # Engine Error Types
//!
//! Protocol-level failures. Math errors from the core crate are carried
//! through unchanged so callers can distinguish an overflow from a
//! business-rule rejection.

use thiserror::Error;

use fluxswap_core::CoreError;

/// Errors raised by the stateful engines
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("token already registered: {0}")]
    TokenAlreadyExists(String),

    #[error("pool already exists")]
    PoolAlreadyExists,

    #[error("invalid pool parameters: {0}")]
    InvalidPoolParams(String),

    #[error("pool not found")]
    PoolNotFound,

    #[error("position not found: {0}")]
    PositionNotFound(u64),

    #[error("caller does not own this resource")]
    Unauthorized,

    #[error("position is not empty")]
    PositionNotEmpty,

    #[error("proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("proposal is not active")]
    ProposalNotActive,

    #[error("insufficient voting power: have {have}, need {need}")]
    InsufficientPower { have: u64, need: u64 },

    #[error("treasury action not allowed")]
    InvalidTreasuryAction,

    #[error("slippage exceeded: impact {impact_bps} bps, maximum {max_bps} bps")]
    SlippageExceeded { impact_bps: u64, max_bps: u64 },

    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    #[error("invalid amount")]
    InvalidAmount,

    #[error("invalid tick range: [{lower}, {upper})")]
    InvalidTickRange { lower: i32, upper: i32 },

    #[error("journal error: {0}")]
    Journal(String),

    #[error("config error: {0}")]
    Config(String),
}

/// Result type using engine errors
pub type EngineResult<T> = Result<T, EngineError>;
