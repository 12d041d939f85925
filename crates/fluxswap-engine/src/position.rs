//! # Position Manager
//!
//! Liquidity position lifecycle: open, collect accrued fees, close.
//! Positions reference pool state but live outside it; every mutation
//! that touches a pool takes that pool's write lock, so position changes
//! serialize with swaps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::info;

use fluxswap_core::math::fee_math::fees_owed;
use fluxswap_core::math::liquidity_math::{amounts_for_liquidity, liquidity_for_amounts};
use fluxswap_core::math::tick_math::sqrt_price_at_tick;
use fluxswap_core::types::{PoolKey, Position};
use fluxswap_core::CoreError;

use crate::errors::{EngineError, EngineResult};
use crate::pool::{read_lock, write_lock, PoolEngine};
use crate::registry::TokenRegistry;

/// Result of closing a position: principal withdrawn plus fees settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseOutcome {
    pub amount_a: u64,
    pub amount_b: u64,
    pub fees_a: u64,
    pub fees_b: u64,
}

#[derive(Default)]
pub struct PositionManager {
    positions: RwLock<HashMap<u64, Position>>,
    next_id: AtomicU64,
}

impl PositionManager {
    pub fn new() -> Self {
        Self {
            positions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a position over `[tick_lower, tick_upper)`.
    ///
    /// The deposited liquidity is the largest amount both desired token
    /// amounts can fund at the current price; deposits round up in the
    /// pool's favor. Positions below `min_liquidity` are rejected so dust
    /// cannot accumulate.
    #[allow(clippy::too_many_arguments)]
    pub fn open_position(
        &self,
        pools: &PoolEngine,
        registry: &TokenRegistry,
        key: PoolKey,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        amount_a_desired: u64,
        amount_b_desired: u64,
        min_liquidity: u128,
    ) -> EngineResult<Position> {
        let state = pools.state(&key)?;
        let mut pool = write_lock(&state);

        if tick_lower >= tick_upper {
            return Err(EngineError::InvalidTickRange {
                lower: tick_lower,
                upper: tick_upper,
            });
        }

        let sqrt_lower = sqrt_price_at_tick(tick_lower)?;
        let sqrt_upper = sqrt_price_at_tick(tick_upper)?;
        let liquidity = liquidity_for_amounts(
            pool.sqrt_price_x64,
            sqrt_lower,
            sqrt_upper,
            amount_a_desired,
            amount_b_desired,
        )?;
        if liquidity < min_liquidity {
            return Err(EngineError::Core(CoreError::InsufficientLiquidity));
        }

        // Settle the deposit before touching pool state so a failed
        // debit leaves the pool unchanged.
        let (amount_a, amount_b) = amounts_for_liquidity(
            pool.sqrt_price_x64,
            sqrt_lower,
            sqrt_upper,
            liquidity,
            true,
        )?;
        registry.burn(owner, key.token_a, amount_a)?;
        match registry.burn(owner, key.token_b, amount_b) {
            Ok(()) => {}
            Err(e) => {
                registry.mint(owner, key.token_a, amount_a)?;
                return Err(e);
            }
        }

        let liquidity_delta = i128::try_from(liquidity).map_err(|_| CoreError::Overflow)?;
        pool.modify_liquidity(tick_lower, tick_upper, liquidity_delta)?;

        // Snapshot after the ticks are initialized.
        let (inside_a, inside_b) = pool.fee_growth_inside_pair(tick_lower, tick_upper);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let position = Position {
            id,
            owner: owner.to_string(),
            pool: key,
            tick_lower,
            tick_upper,
            liquidity,
            fee_growth_inside_last_a_x64: inside_a,
            fee_growth_inside_last_b_x64: inside_b,
            tokens_owed_a: 0,
            tokens_owed_b: 0,
        };
        write_lock(&self.positions).insert(id, position.clone());

        info!(
            owner,
            position_id = id,
            tick_lower,
            tick_upper,
            liquidity,
            amount_a,
            amount_b,
            "opened position"
        );
        Ok(position)
    }

    /// Collect the fees a position has accrued since its last snapshot.
    ///
    /// Idempotent: a second call with no intervening swaps pays nothing.
    pub fn collect_fees(
        &self,
        pools: &PoolEngine,
        registry: &TokenRegistry,
        position_id: u64,
        caller: &str,
    ) -> EngineResult<(u64, u64)> {
        let mut positions = write_lock(&self.positions);
        let position = positions
            .get_mut(&position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;
        if position.owner != caller {
            return Err(EngineError::Unauthorized);
        }

        let state = pools.state(&position.pool)?;
        let (inside_a, inside_b) = {
            let pool = read_lock(&state);
            pool.fee_growth_inside_pair(position.tick_lower, position.tick_upper)
        };

        let owed_a = fees_owed(
            position.liquidity,
            position.fee_growth_inside_last_a_x64,
            inside_a,
        )?
        .checked_add(position.tokens_owed_a)
        .ok_or(CoreError::Overflow)?;
        let owed_b = fees_owed(
            position.liquidity,
            position.fee_growth_inside_last_b_x64,
            inside_b,
        )?
        .checked_add(position.tokens_owed_b)
        .ok_or(CoreError::Overflow)?;

        position.fee_growth_inside_last_a_x64 = inside_a;
        position.fee_growth_inside_last_b_x64 = inside_b;
        position.tokens_owed_a = 0;
        position.tokens_owed_b = 0;

        if owed_a > 0 {
            registry.mint(caller, position.pool.token_a, owed_a)?;
        }
        if owed_b > 0 {
            registry.mint(caller, position.pool.token_b, owed_b)?;
        }

        info!(caller, position_id, owed_a, owed_b, "collected fees");
        Ok((owed_a, owed_b))
    }

    /// Close a position in full: settle outstanding fees, withdraw the
    /// principal (rounded down), and delete the record. Partial closes
    /// are not supported.
    pub fn close_position(
        &self,
        pools: &PoolEngine,
        registry: &TokenRegistry,
        position_id: u64,
        caller: &str,
    ) -> EngineResult<CloseOutcome> {
        let mut positions = write_lock(&self.positions);
        let position = positions
            .get(&position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?
            .clone();
        if position.owner != caller {
            return Err(EngineError::Unauthorized);
        }

        let state = pools.state(&position.pool)?;
        let mut pool = write_lock(&state);

        // Fees must be read out before the range's ticks can disappear.
        let (inside_a, inside_b) =
            pool.fee_growth_inside_pair(position.tick_lower, position.tick_upper);
        let fees_a = fees_owed(
            position.liquidity,
            position.fee_growth_inside_last_a_x64,
            inside_a,
        )?
        .checked_add(position.tokens_owed_a)
        .ok_or(CoreError::Overflow)?;
        let fees_b = fees_owed(
            position.liquidity,
            position.fee_growth_inside_last_b_x64,
            inside_b,
        )?
        .checked_add(position.tokens_owed_b)
        .ok_or(CoreError::Overflow)?;

        let liquidity_delta = i128::try_from(position.liquidity)
            .map_err(|_| CoreError::Overflow)?;
        let (amount_a, amount_b) =
            pool.modify_liquidity(position.tick_lower, position.tick_upper, -liquidity_delta)?;

        let payout_a = amount_a.checked_add(fees_a).ok_or(CoreError::Overflow)?;
        let payout_b = amount_b.checked_add(fees_b).ok_or(CoreError::Overflow)?;
        if payout_a > 0 {
            registry.mint(caller, position.pool.token_a, payout_a)?;
        }
        if payout_b > 0 {
            registry.mint(caller, position.pool.token_b, payout_b)?;
        }

        positions.remove(&position_id);
        info!(
            caller,
            position_id, amount_a, amount_b, fees_a, fees_b, "closed position"
        );
        Ok(CloseOutcome {
            amount_a,
            amount_b,
            fees_a,
            fees_b,
        })
    }

    /// Look up a position by id
    pub fn position(&self, position_id: u64) -> EngineResult<Position> {
        read_lock(&self.positions)
            .get(&position_id)
            .cloned()
            .ok_or(EngineError::PositionNotFound(position_id))
    }

    /// All positions owned by `owner`, ordered by id
    pub fn positions_of(&self, owner: &str) -> Vec<Position> {
        let mut result: Vec<Position> = read_lock(&self.positions)
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        result.sort_by_key(|p| p.id);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxswap_core::constants::Q64;
    use fluxswap_core::types::TokenId;

    fn setup() -> (PoolEngine, TokenRegistry, PositionManager, PoolKey) {
        let pools = PoolEngine::new();
        let registry = TokenRegistry::new();
        let manager = PositionManager::new();
        registry.register("ETH", 18).unwrap();
        registry.register("USDC", 6).unwrap();
        let key = PoolKey {
            token_a: TokenId(0),
            token_b: TokenId(1),
            fee_bps: 25,
        };
        pools.create_pool(key, Q64).unwrap();
        registry.mint("alice", key.token_a, 1_000_000_000).unwrap();
        registry.mint("alice", key.token_b, 1_000_000_000).unwrap();
        (pools, registry, manager, key)
    }

    #[test]
    fn test_open_rejects_dust() {
        let (pools, registry, manager, key) = setup();
        let err = manager
            .open_position(&pools, &registry, key, "alice", -1_000, 1_000, 1, 1, 1_000)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientLiquidity)
        ));
        // Nothing was debited.
        assert_eq!(registry.balance_of("alice", key.token_a), 1_000_000_000);
    }

    #[test]
    fn test_open_debits_both_tokens_in_range() {
        let (pools, registry, manager, key) = setup();
        let position = manager
            .open_position(
                &pools,
                &registry,
                key,
                "alice",
                -1_000,
                1_000,
                100_000_000,
                100_000_000,
                1_000,
            )
            .unwrap();
        assert!(position.liquidity >= 1_000);
        assert!(registry.balance_of("alice", key.token_a) < 1_000_000_000);
        assert!(registry.balance_of("alice", key.token_b) < 1_000_000_000);

        let pool = pools.pool(&key).unwrap();
        assert_eq!(pool.liquidity, position.liquidity);
    }

    #[test]
    fn test_open_out_of_range_is_single_sided() {
        let (pools, registry, manager, key) = setup();
        // Entirely above the current price: token A only.
        let position = manager
            .open_position(
                &pools,
                &registry,
                key,
                "alice",
                1_000,
                2_000,
                100_000_000,
                100_000_000,
                1,
            )
            .unwrap();
        assert!(position.liquidity > 0);
        assert!(registry.balance_of("alice", key.token_a) < 1_000_000_000);
        assert_eq!(registry.balance_of("alice", key.token_b), 1_000_000_000);

        // Out-of-range liquidity is not active.
        let pool = pools.pool(&key).unwrap();
        assert_eq!(pool.liquidity, 0);
    }

    #[test]
    fn test_collect_fees_idempotent() {
        let (pools, registry, manager, key) = setup();
        let position = manager
            .open_position(
                &pools,
                &registry,
                key,
                "alice",
                -1_000,
                1_000,
                500_000_000,
                500_000_000,
                1,
            )
            .unwrap();

        registry.mint("bob", key.token_a, 10_000_000).unwrap();
        pools
            .execute_swap(&registry, &key, "bob", key.token_a, 10_000_000, 5_000, 0)
            .unwrap();

        let (fees_a, fees_b) = manager
            .collect_fees(&pools, &registry, position.id, "alice")
            .unwrap();
        assert!(fees_a > 0);
        assert_eq!(fees_b, 0);

        // No swaps in between: the second collection pays nothing.
        let (again_a, again_b) = manager
            .collect_fees(&pools, &registry, position.id, "alice")
            .unwrap();
        assert_eq!((again_a, again_b), (0, 0));
    }

    #[test]
    fn test_close_returns_principal_and_fees() {
        let (pools, registry, manager, key) = setup();
        let position = manager
            .open_position(
                &pools,
                &registry,
                key,
                "alice",
                -1_000,
                1_000,
                500_000_000,
                500_000_000,
                1,
            )
            .unwrap();
        let balance_a_after_open = registry.balance_of("alice", key.token_a);

        registry.mint("bob", key.token_a, 10_000_000).unwrap();
        pools
            .execute_swap(&registry, &key, "bob", key.token_a, 10_000_000, 5_000, 0)
            .unwrap();

        let outcome = manager
            .close_position(&pools, &registry, position.id, "alice")
            .unwrap();
        assert!(outcome.amount_a > 0);
        assert!(outcome.amount_b > 0);
        assert!(outcome.fees_a > 0);
        assert!(registry.balance_of("alice", key.token_a) > balance_a_after_open);

        assert!(matches!(
            manager.position(position.id),
            Err(EngineError::PositionNotFound(_))
        ));
        let pool = pools.pool(&key).unwrap();
        assert_eq!(pool.liquidity, 0);
    }

    #[test]
    fn test_only_owner_may_manage() {
        let (pools, registry, manager, key) = setup();
        let position = manager
            .open_position(
                &pools,
                &registry,
                key,
                "alice",
                -1_000,
                1_000,
                100_000_000,
                100_000_000,
                1,
            )
            .unwrap();
        assert!(matches!(
            manager.collect_fees(&pools, &registry, position.id, "mallory"),
            Err(EngineError::Unauthorized)
        ));
        assert!(matches!(
            manager.close_position(&pools, &registry, position.id, "mallory"),
            Err(EngineError::Unauthorized)
        ));
    }
}
