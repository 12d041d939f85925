//! Pool identity and state snapshot.

use serde::{Deserialize, Serialize};

use crate::types::token::TokenId;

/// Pool identity: one pool exists per (token_a, token_b, fee tier) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub token_a: TokenId,
    pub token_b: TokenId,
    /// Fee tier in basis points
    pub fee_bps: u16,
}

/// Immutable snapshot of a pool's state, returned to callers.
///
/// Prices are sqrt prices in Q64.64. `liquidity` is the active liquidity
/// at `current_tick`: the sum of the liquidity of every position whose
/// range contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub key: PoolKey,
    pub sqrt_price_x64: u128,
    pub current_tick: i32,
    pub liquidity: u128,
    /// Global per-unit-liquidity fee accumulators, Q64.64, wrapping
    pub fee_growth_global_a_x64: u128,
    pub fee_growth_global_b_x64: u128,
    pub reserve_a: u128,
    pub reserve_b: u128,
    /// Cumulative swap fees ever collected by this pool
    pub collected_fees_a: u128,
    pub collected_fees_b: u128,
}
