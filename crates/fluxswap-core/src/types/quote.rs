//! Swap results returned to callers.

use serde::{Deserialize, Serialize};

use crate::types::token::TokenId;

/// Computed result of a swap or swap simulation. Immutable; never
/// persisted as pool state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub amount_in: u64,
    pub amount_out: u64,
    /// Total fee deducted from the input
    pub fee_paid: u64,
    /// Deviation of the execution price from the pre-swap spot price
    pub price_impact_bps: u64,
    /// Number of initialized tick boundaries crossed
    pub crossed_ticks: u32,
}

/// Append-only record of an executed swap, kept per pool for history
/// display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trader: String,
    pub token_in: TokenId,
    pub amount_in: u64,
    pub amount_out: u64,
    pub fee_paid: u64,
    pub timestamp: i64,
}
