//! # Copy Trading
//!
//! Followers mirror a leader's executed swaps, scaled by a per-follow
//! ratio. Mirrored fills are isolated from each other and from the
//! leader: a follower without funds simply records a failed fill and the
//! remaining followers still execute.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{info, warn};

use fluxswap_core::constants::BPS_DENOMINATOR;
use fluxswap_core::types::{PoolKey, SwapQuote, TokenId};

use crate::errors::{EngineError, EngineResult};
use crate::pool::{read_lock, write_lock, PoolEngine};
use crate::registry::TokenRegistry;

/// An active follow relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowConfig {
    pub leader: String,
    /// Fraction of the leader's input the follower mirrors, in basis
    /// points of the leader's amount, at most 10_000
    pub ratio_bps: u16,
}

/// Outcome of one mirrored fill
#[derive(Debug, Clone)]
pub struct CopyFill {
    pub follower: String,
    /// Scaled input the mirror attempted
    pub amount_in: u64,
    pub result: Result<SwapQuote, EngineError>,
}

/// Follower book: each follower mirrors at most one leader
#[derive(Default)]
pub struct CopyTradingLedger {
    follows: RwLock<HashMap<String, FollowConfig>>,
}

impl CopyTradingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or retune) mirroring a leader. Replaces any existing
    /// follow by this follower.
    pub fn follow(&self, follower: &str, leader: &str, ratio_bps: u16) -> EngineResult<()> {
        if follower == leader {
            return Err(EngineError::InvalidAmount);
        }
        if ratio_bps == 0 || ratio_bps as u64 > BPS_DENOMINATOR {
            return Err(EngineError::InvalidAmount);
        }
        write_lock(&self.follows).insert(
            follower.to_string(),
            FollowConfig {
                leader: leader.to_string(),
                ratio_bps,
            },
        );
        info!(follower, leader, ratio_bps, "follow started");
        Ok(())
    }

    /// Stop mirroring. A no-op when no follow exists.
    pub fn unfollow(&self, follower: &str) {
        if write_lock(&self.follows).remove(follower).is_some() {
            info!(follower, "follow removed");
        }
    }

    /// The follow configured by `follower`, if any
    pub fn follow_of(&self, follower: &str) -> Option<FollowConfig> {
        read_lock(&self.follows).get(follower).cloned()
    }

    /// Followers of `leader` with their ratios, ordered by name for
    /// deterministic replay
    pub fn followers_of(&self, leader: &str) -> Vec<(String, u16)> {
        let mut result: Vec<(String, u16)> = read_lock(&self.follows)
            .iter()
            .filter(|(_, config)| config.leader == leader)
            .map(|(follower, config)| (follower.clone(), config.ratio_bps))
            .collect();
        result.sort();
        result
    }

    /// Mirror an executed leader swap across all followers. Scaled
    /// inputs round down; a scaled input of zero records a failed fill
    /// without touching the pool. Individual failures never propagate.
    #[allow(clippy::too_many_arguments)]
    pub fn mirror_swap(
        &self,
        pools: &PoolEngine,
        registry: &TokenRegistry,
        key: &PoolKey,
        leader: &str,
        token_in: TokenId,
        leader_amount_in: u64,
        max_slippage_bps: u16,
        timestamp: i64,
    ) -> Vec<CopyFill> {
        let mut fills = Vec::new();
        for (follower, ratio_bps) in self.followers_of(leader) {
            let scaled = ((leader_amount_in as u128 * ratio_bps as u128)
                / BPS_DENOMINATOR as u128) as u64;
            let result = if scaled == 0 {
                Err(EngineError::InvalidAmount)
            } else {
                pools.execute_swap(
                    registry,
                    key,
                    &follower,
                    token_in,
                    scaled,
                    max_slippage_bps,
                    timestamp,
                )
            };
            if let Err(ref error) = result {
                warn!(%follower, leader, scaled, %error, "mirrored swap failed");
            }
            fills.push(CopyFill {
                follower,
                amount_in: scaled,
                result,
            });
        }
        fills
    }
}
