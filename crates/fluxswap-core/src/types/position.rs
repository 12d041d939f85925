//! Liquidity position records.

use serde::{Deserialize, Serialize};

use crate::types::pool::PoolKey;

/// A concentrated-liquidity position over `[tick_lower, tick_upper)`.
///
/// Invariant: `tick_lower < tick_upper`. Fee snapshots are Q64.64
/// per-unit-liquidity accumulators taken at open or last collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub owner: String,
    pub pool: PoolKey,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub fee_growth_inside_last_a_x64: u128,
    pub fee_growth_inside_last_b_x64: u128,
    pub tokens_owed_a: u64,
    pub tokens_owed_b: u64,
}

impl Position {
    /// Whether the position's range contains a tick
    pub fn in_range(&self, tick: i32) -> bool {
        self.tick_lower <= tick && tick < self.tick_upper
    }
}
