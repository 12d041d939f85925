//! # Pool Engine
//!
//! Stateful concentrated-liquidity pools and the tick-walking swap path.
//! Quotes and executions share one planning routine so a quote followed
//! immediately by an execution returns identical numbers; executions then
//! apply the planned effects under the pool's write lock, which is the
//! single-writer point for all pool state.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use fluxswap_core::constants::{
    BPS_DENOMINATOR, MAX_FEE_BPS, MAX_SLIPPAGE_BPS, MAX_SQRT_PRICE_X64, MAX_SWAP_STEPS,
    MIN_FEE_BPS, MIN_SQRT_PRICE_X64, Q64,
};
use fluxswap_core::math::fee_math::{fee_growth_from_fee, fee_growth_inside};
use fluxswap_core::math::tick_math::{is_tick_valid, sqrt_price_at_tick, tick_at_sqrt_price};
use fluxswap_core::math::{compute_swap_step, mul_div_u128, Rounding, StepOutcome};
use fluxswap_core::types::{Pool, PoolKey, SwapQuote, TokenId, TradeRecord};
use fluxswap_core::CoreError;

use crate::errors::{EngineError, EngineResult};
use crate::registry::TokenRegistry;

/// Per-tick accounting for initialized ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickMeta {
    /// Liquidity added when crossing this tick upward, removed downward
    pub liquidity_net: i128,
    /// Total liquidity referencing this tick; the tick is dropped when
    /// this reaches zero
    pub liquidity_gross: u128,
    /// Fee growth on the far side of this tick relative to the current
    /// price, Q64.64, wrapping
    pub fee_growth_outside_a_x64: u128,
    pub fee_growth_outside_b_x64: u128,
}

/// Mutable state of one pool. Access is always mediated by the pool's
/// `RwLock`: quotes take the read side, every mutation takes the write
/// side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolState {
    pub key: PoolKey,
    pub sqrt_price_x64: u128,
    pub current_tick: i32,
    pub liquidity: u128,
    pub fee_growth_global_a_x64: u128,
    pub fee_growth_global_b_x64: u128,
    pub reserve_a: u128,
    pub reserve_b: u128,
    pub collected_fees_a: u128,
    pub collected_fees_b: u128,
    pub ticks: BTreeMap<i32, TickMeta>,
    pub trades: Vec<TradeRecord>,
}

/// New "outside" accumulators for a tick crossed during a swap
#[derive(Debug, Clone, Copy)]
struct TickCrossing {
    tick: i32,
    outside_a_x64: u128,
    outside_b_x64: u128,
}

/// Fully computed effect of a swap, produced without mutating the pool
#[derive(Debug, Clone)]
struct SwapPlan {
    a_to_b: bool,
    amount_in: u64,
    amount_out: u64,
    fee_paid: u64,
    sqrt_price_after_x64: u128,
    tick_after: i32,
    liquidity_after: u128,
    fee_growth_global_a_x64: u128,
    fee_growth_global_b_x64: u128,
    crossings: Vec<TickCrossing>,
    price_impact_bps: u64,
}

impl PoolState {
    fn new(key: PoolKey, sqrt_price_x64: u128) -> EngineResult<Self> {
        let current_tick = tick_at_sqrt_price(sqrt_price_x64)?;
        Ok(Self {
            key,
            sqrt_price_x64,
            current_tick,
            liquidity: 0,
            fee_growth_global_a_x64: 0,
            fee_growth_global_b_x64: 0,
            reserve_a: 0,
            reserve_b: 0,
            collected_fees_a: 0,
            collected_fees_b: 0,
            ticks: BTreeMap::new(),
            trades: Vec::new(),
        })
    }

    /// Read-only snapshot for callers
    pub fn snapshot(&self) -> Pool {
        Pool {
            key: self.key,
            sqrt_price_x64: self.sqrt_price_x64,
            current_tick: self.current_tick,
            liquidity: self.liquidity,
            fee_growth_global_a_x64: self.fee_growth_global_a_x64,
            fee_growth_global_b_x64: self.fee_growth_global_b_x64,
            reserve_a: self.reserve_a,
            reserve_b: self.reserve_b,
            collected_fees_a: self.collected_fees_a,
            collected_fees_b: self.collected_fees_b,
        }
    }

    /// Fee growth inside a tick range for both tokens
    pub(crate) fn fee_growth_inside_pair(&self, tick_lower: i32, tick_upper: i32) -> (u128, u128) {
        let lower = self.ticks.get(&tick_lower).copied().unwrap_or_default();
        let upper = self.ticks.get(&tick_upper).copied().unwrap_or_default();
        let inside_a = fee_growth_inside(
            tick_lower,
            tick_upper,
            self.current_tick,
            self.fee_growth_global_a_x64,
            lower.fee_growth_outside_a_x64,
            upper.fee_growth_outside_a_x64,
        );
        let inside_b = fee_growth_inside(
            tick_lower,
            tick_upper,
            self.current_tick,
            self.fee_growth_global_b_x64,
            lower.fee_growth_outside_b_x64,
            upper.fee_growth_outside_b_x64,
        );
        (inside_a, inside_b)
    }

    fn update_tick(&mut self, tick: i32, liquidity_delta: i128, is_upper: bool) -> EngineResult<()> {
        let meta = self.ticks.entry(tick).or_insert_with(|| {
            // Convention: a freshly initialized tick at or below the
            // current price has seen all growth so far on its far side.
            let below = tick <= self.current_tick;
            TickMeta {
                liquidity_net: 0,
                liquidity_gross: 0,
                fee_growth_outside_a_x64: if below { self.fee_growth_global_a_x64 } else { 0 },
                fee_growth_outside_b_x64: if below { self.fee_growth_global_b_x64 } else { 0 },
            }
        });

        let gross_delta = liquidity_delta.unsigned_abs();
        meta.liquidity_gross = if liquidity_delta >= 0 {
            meta.liquidity_gross
                .checked_add(gross_delta)
                .ok_or(CoreError::Overflow)?
        } else {
            meta.liquidity_gross
                .checked_sub(gross_delta)
                .ok_or(CoreError::InsufficientLiquidity)?
        };
        let signed = if is_upper { -liquidity_delta } else { liquidity_delta };
        meta.liquidity_net = meta
            .liquidity_net
            .checked_add(signed)
            .ok_or(CoreError::Overflow)?;

        if meta.liquidity_gross == 0 {
            self.ticks.remove(&tick);
        }
        Ok(())
    }

    /// Apply a liquidity change over a tick range. Returns the token
    /// amounts moved: deposits for a positive delta (rounded up),
    /// withdrawals for a negative one (rounded down).
    pub(crate) fn modify_liquidity(
        &mut self,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> EngineResult<(u64, u64)> {
        if tick_lower >= tick_upper || !is_tick_valid(tick_lower) || !is_tick_valid(tick_upper) {
            return Err(EngineError::InvalidTickRange {
                lower: tick_lower,
                upper: tick_upper,
            });
        }
        if liquidity_delta == 0 {
            return Ok((0, 0));
        }

        let sqrt_lower = sqrt_price_at_tick(tick_lower)?;
        let sqrt_upper = sqrt_price_at_tick(tick_upper)?;
        let adding = liquidity_delta > 0;
        let (amount_a, amount_b) = fluxswap_core::math::liquidity_math::amounts_for_liquidity(
            self.sqrt_price_x64,
            sqrt_lower,
            sqrt_upper,
            liquidity_delta.unsigned_abs(),
            adding,
        )?;

        self.update_tick(tick_lower, liquidity_delta, false)?;
        self.update_tick(tick_upper, liquidity_delta, true)?;

        if tick_lower <= self.current_tick && self.current_tick < tick_upper {
            self.liquidity = apply_liquidity_delta(self.liquidity, liquidity_delta)?;
        }

        if adding {
            self.reserve_a = self
                .reserve_a
                .checked_add(amount_a as u128)
                .ok_or(CoreError::Overflow)?;
            self.reserve_b = self
                .reserve_b
                .checked_add(amount_b as u128)
                .ok_or(CoreError::Overflow)?;
        } else {
            self.reserve_a = self
                .reserve_a
                .checked_sub(amount_a as u128)
                .ok_or(CoreError::InsufficientLiquidity)?;
            self.reserve_b = self
                .reserve_b
                .checked_sub(amount_b as u128)
                .ok_or(CoreError::InsufficientLiquidity)?;
        }
        Ok((amount_a, amount_b))
    }

    /// Plan a swap without mutating any state. The walk moves the price
    /// toward the input token's direction, consuming liquidity range by
    /// range and crossing initialized ticks until the input is spent.
    ///
    /// A boundary price belongs to the tick above it, so a downward walk
    /// crosses a tick only when it continues below the boundary, while an
    /// upward walk crosses on landing.
    fn plan_swap(&self, a_to_b: bool, amount_in: u64) -> EngineResult<SwapPlan> {
        if amount_in == 0 {
            return Err(EngineError::InvalidAmount);
        }

        let fee_bps = self.key.fee_bps;
        let spot_sqrt_price = self.sqrt_price_x64;
        let mut sqrt_price = self.sqrt_price_x64;
        let mut tick = self.current_tick;
        let mut liquidity = self.liquidity;
        let mut global_a = self.fee_growth_global_a_x64;
        let mut global_b = self.fee_growth_global_b_x64;

        let mut remaining = amount_in;
        let mut amount_out: u64 = 0;
        let mut fee_paid: u64 = 0;
        let mut crossings = Vec::new();

        let mut steps = 0u32;
        while remaining > 0 {
            steps += 1;
            if steps > MAX_SWAP_STEPS as u32 {
                return Err(EngineError::Core(CoreError::InsufficientLiquidity));
            }

            let next_initialized = if a_to_b {
                self.ticks.range(..=tick).next_back().map(|(t, _)| *t)
            } else {
                self.ticks.range(tick + 1..).next().map(|(t, _)| *t)
            };
            let target_price = match next_initialized {
                Some(t) => sqrt_price_at_tick(t)?,
                None if a_to_b => MIN_SQRT_PRICE_X64,
                None => MAX_SQRT_PRICE_X64,
            };

            // Empty range or a zero-width step at a boundary: cross the
            // next initialized tick without consuming input.
            if liquidity == 0 || (a_to_b && sqrt_price == target_price) {
                let Some(crossed) = next_initialized else {
                    break;
                };
                sqrt_price = target_price;
                let meta = self.cross_tick(
                    crossed,
                    global_a,
                    global_b,
                    &crossings,
                    &mut liquidity,
                    a_to_b,
                )?;
                crossings.push(meta);
                tick = if a_to_b { crossed - 1 } else { crossed };
                continue;
            }

            let step = compute_swap_step(sqrt_price, target_price, liquidity, remaining, fee_bps)?;
            remaining -= step.amount_in;
            amount_out = amount_out
                .checked_add(step.amount_out)
                .ok_or(CoreError::Overflow)?;
            fee_paid = fee_paid
                .checked_add(step.fee_amount)
                .ok_or(CoreError::Overflow)?;
            if step.fee_amount > 0 {
                let growth = fee_growth_from_fee(step.fee_amount, liquidity)?;
                if a_to_b {
                    global_a = global_a.wrapping_add(growth);
                } else {
                    global_b = global_b.wrapping_add(growth);
                }
            }
            sqrt_price = step.sqrt_price_next_x64;

            match step.outcome {
                StepOutcome::ExhaustedInput => {
                    tick = tick_at_sqrt_price(sqrt_price)?;
                    // An upward walk landing exactly on the next boundary
                    // activates the range above it.
                    if !a_to_b {
                        if let Some(boundary) = next_initialized {
                            if tick >= boundary {
                                let meta = self.cross_tick(
                                    boundary,
                                    global_a,
                                    global_b,
                                    &crossings,
                                    &mut liquidity,
                                    a_to_b,
                                )?;
                                crossings.push(meta);
                            }
                        }
                    }
                    break;
                }
                StepOutcome::ReachedTarget => match next_initialized {
                    Some(boundary) => {
                        if a_to_b && remaining == 0 {
                            // Stopping exactly on the boundary keeps the
                            // higher tick's range active.
                            tick = boundary;
                            break;
                        }
                        let meta = self.cross_tick(
                            boundary,
                            global_a,
                            global_b,
                            &crossings,
                            &mut liquidity,
                            a_to_b,
                        )?;
                        crossings.push(meta);
                        tick = if a_to_b { boundary - 1 } else { boundary };
                    }
                    None => break,
                },
            }
        }

        if remaining > 0 {
            return Err(EngineError::Core(CoreError::InsufficientLiquidity));
        }

        let price_impact_bps = price_impact_bps(spot_sqrt_price, a_to_b, amount_in, amount_out)?;

        Ok(SwapPlan {
            a_to_b,
            amount_in,
            amount_out,
            fee_paid,
            sqrt_price_after_x64: sqrt_price,
            tick_after: tick,
            liquidity_after: liquidity,
            fee_growth_global_a_x64: global_a,
            fee_growth_global_b_x64: global_b,
            crossings,
            price_impact_bps,
        })
    }

    /// Flip a tick's outside accumulators against the running globals and
    /// fold its net liquidity into the walk. Pure with respect to `self`;
    /// a tick crossed twice in one walk reuses the previously planned
    /// values.
    fn cross_tick(
        &self,
        tick: i32,
        global_a: u128,
        global_b: u128,
        planned: &[TickCrossing],
        liquidity: &mut u128,
        a_to_b: bool,
    ) -> EngineResult<TickCrossing> {
        let meta = self
            .ticks
            .get(&tick)
            .copied()
            .ok_or(CoreError::InsufficientLiquidity)?;
        let (outside_a, outside_b) = planned
            .iter()
            .rev()
            .find(|c| c.tick == tick)
            .map(|c| (c.outside_a_x64, c.outside_b_x64))
            .unwrap_or((meta.fee_growth_outside_a_x64, meta.fee_growth_outside_b_x64));

        let delta = if a_to_b { -meta.liquidity_net } else { meta.liquidity_net };
        *liquidity = apply_liquidity_delta(*liquidity, delta)?;

        Ok(TickCrossing {
            tick,
            outside_a_x64: global_a.wrapping_sub(outside_a),
            outside_b_x64: global_b.wrapping_sub(outside_b),
        })
    }

    fn apply_plan(&mut self, plan: &SwapPlan) -> EngineResult<()> {
        self.sqrt_price_x64 = plan.sqrt_price_after_x64;
        self.current_tick = plan.tick_after;
        self.liquidity = plan.liquidity_after;
        self.fee_growth_global_a_x64 = plan.fee_growth_global_a_x64;
        self.fee_growth_global_b_x64 = plan.fee_growth_global_b_x64;
        for crossing in &plan.crossings {
            if let Some(meta) = self.ticks.get_mut(&crossing.tick) {
                meta.fee_growth_outside_a_x64 = crossing.outside_a_x64;
                meta.fee_growth_outside_b_x64 = crossing.outside_b_x64;
            }
        }

        let net_in = (plan.amount_in - plan.fee_paid) as u128;
        if plan.a_to_b {
            self.reserve_a = self.reserve_a.checked_add(net_in).ok_or(CoreError::Overflow)?;
            self.reserve_b = self
                .reserve_b
                .checked_sub(plan.amount_out as u128)
                .ok_or(CoreError::InsufficientLiquidity)?;
            self.collected_fees_a += plan.fee_paid as u128;
        } else {
            self.reserve_b = self.reserve_b.checked_add(net_in).ok_or(CoreError::Overflow)?;
            self.reserve_a = self
                .reserve_a
                .checked_sub(plan.amount_out as u128)
                .ok_or(CoreError::InsufficientLiquidity)?;
            self.collected_fees_b += plan.fee_paid as u128;
        }
        Ok(())
    }
}

fn apply_liquidity_delta(liquidity: u128, delta: i128) -> EngineResult<u128> {
    if delta >= 0 {
        liquidity
            .checked_add(delta as u128)
            .ok_or_else(|| CoreError::Overflow.into())
    } else {
        liquidity
            .checked_sub(delta.unsigned_abs())
            .ok_or_else(|| CoreError::InsufficientLiquidity.into())
    }
}

/// Deviation of the realized execution price from the pre-swap spot
/// price, in basis points of the spot-implied output
fn price_impact_bps(
    spot_sqrt_price_x64: u128,
    a_to_b: bool,
    amount_in: u64,
    amount_out: u64,
) -> EngineResult<u64> {
    let expected = if a_to_b {
        let interim = mul_div_u128(
            amount_in as u128,
            spot_sqrt_price_x64,
            Q64,
            Rounding::Down,
        )?;
        mul_div_u128(interim, spot_sqrt_price_x64, Q64, Rounding::Down)?
    } else {
        let interim = mul_div_u128(amount_in as u128, Q64, spot_sqrt_price_x64, Rounding::Down)?;
        mul_div_u128(interim, Q64, spot_sqrt_price_x64, Rounding::Down)?
    };
    if expected == 0 || amount_out as u128 >= expected {
        return Ok(0);
    }
    let shortfall = expected - amount_out as u128;
    Ok(mul_div_u128(shortfall, BPS_DENOMINATOR as u128, expected, Rounding::Down)? as u64)
}

/// All pools, keyed by (token pair, fee tier). The outer map lock is held
/// only to look up or insert a pool; per-pool locks serialize access to
/// pool state.
#[derive(Default)]
pub struct PoolEngine {
    pools: RwLock<HashMap<PoolKey, Arc<RwLock<PoolState>>>>,
}

impl PoolEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool at an initial sqrt price
    pub fn create_pool(&self, key: PoolKey, sqrt_price_x64: u128) -> EngineResult<Pool> {
        if key.token_a == key.token_b {
            return Err(EngineError::InvalidPoolParams(
                "pool tokens must differ".to_string(),
            ));
        }
        if key.fee_bps < MIN_FEE_BPS || key.fee_bps > MAX_FEE_BPS {
            return Err(EngineError::InvalidPoolParams(format!(
                "fee tier {} bps outside [{MIN_FEE_BPS}, {MAX_FEE_BPS}]",
                key.fee_bps
            )));
        }
        if !(MIN_SQRT_PRICE_X64..=MAX_SQRT_PRICE_X64).contains(&sqrt_price_x64) {
            return Err(EngineError::Core(CoreError::OutOfRangePrice));
        }

        let state = PoolState::new(key, sqrt_price_x64)?;
        let snapshot = state.snapshot();
        let mut pools = write_lock(&self.pools);
        if pools.contains_key(&key) {
            return Err(EngineError::PoolAlreadyExists);
        }
        pools.insert(key, Arc::new(RwLock::new(state)));
        info!(
            token_a = key.token_a.0,
            token_b = key.token_b.0,
            fee_bps = key.fee_bps,
            tick = snapshot.current_tick,
            "created pool"
        );
        Ok(snapshot)
    }

    /// Handle to a pool's state, for liquidity management
    pub(crate) fn state(&self, key: &PoolKey) -> EngineResult<Arc<RwLock<PoolState>>> {
        read_lock(&self.pools)
            .get(key)
            .cloned()
            .ok_or(EngineError::PoolNotFound)
    }

    /// Snapshot of a pool
    pub fn pool(&self, key: &PoolKey) -> EngineResult<Pool> {
        let state = self.state(key)?;
        let guard = read_lock(&state);
        Ok(guard.snapshot())
    }

    /// All pool snapshots
    pub fn pools(&self) -> Vec<Pool> {
        read_lock(&self.pools)
            .values()
            .map(|state| read_lock(state).snapshot())
            .collect()
    }

    /// Simulate a swap against current state without mutating anything.
    /// Fails with `SlippageExceeded` when the computed price impact
    /// exceeds the caller's tolerance.
    pub fn quote_swap(
        &self,
        key: &PoolKey,
        token_in: TokenId,
        amount_in: u64,
        max_slippage_bps: u16,
    ) -> EngineResult<SwapQuote> {
        validate_slippage(max_slippage_bps)?;
        let state = self.state(key)?;
        let guard = read_lock(&state);
        let a_to_b = direction(key, token_in)?;
        let plan = guard.plan_swap(a_to_b, amount_in)?;
        check_impact(&plan, max_slippage_bps)?;
        Ok(quote_from_plan(key, &plan))
    }

    /// Execute a swap: re-plan under the pool's write lock so the quote
    /// is validated against live state, enforce the slippage cap, settle
    /// balances, then apply the planned effects. Balances move before
    /// state so a settlement failure leaves the pool untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_swap(
        &self,
        registry: &TokenRegistry,
        key: &PoolKey,
        trader: &str,
        token_in: TokenId,
        amount_in: u64,
        max_slippage_bps: u16,
        timestamp: i64,
    ) -> EngineResult<SwapQuote> {
        validate_slippage(max_slippage_bps)?;
        let state = self.state(key)?;
        let mut guard = write_lock(&state);
        let a_to_b = direction(key, token_in)?;
        let plan = guard.plan_swap(a_to_b, amount_in)?;
        check_impact(&plan, max_slippage_bps)?;

        let token_out = if a_to_b { key.token_b } else { key.token_a };
        registry.burn(trader, token_in, plan.amount_in)?;
        registry.mint(trader, token_out, plan.amount_out)?;

        guard.apply_plan(&plan)?;
        guard.trades.push(TradeRecord {
            trader: trader.to_string(),
            token_in,
            amount_in: plan.amount_in,
            amount_out: plan.amount_out,
            fee_paid: plan.fee_paid,
            timestamp,
        });

        info!(
            trader,
            token_in = token_in.0,
            amount_in = plan.amount_in,
            amount_out = plan.amount_out,
            fee = plan.fee_paid,
            crossed = plan.crossings.len(),
            "executed swap"
        );
        Ok(quote_from_plan(key, &plan))
    }

    /// Recent trade history of a pool, newest last
    pub fn trade_history(&self, key: &PoolKey, limit: usize) -> EngineResult<Vec<TradeRecord>> {
        let state = self.state(key)?;
        let guard = read_lock(&state);
        let skip = guard.trades.len().saturating_sub(limit);
        Ok(guard.trades[skip..].to_vec())
    }
}

fn validate_slippage(max_slippage_bps: u16) -> EngineResult<()> {
    if max_slippage_bps as u64 > MAX_SLIPPAGE_BPS {
        return Err(EngineError::InvalidAmount);
    }
    Ok(())
}

fn check_impact(plan: &SwapPlan, max_slippage_bps: u16) -> EngineResult<()> {
    if plan.price_impact_bps > max_slippage_bps as u64 {
        return Err(EngineError::SlippageExceeded {
            impact_bps: plan.price_impact_bps,
            max_bps: max_slippage_bps as u64,
        });
    }
    Ok(())
}

fn direction(key: &PoolKey, token_in: TokenId) -> EngineResult<bool> {
    if token_in == key.token_a {
        Ok(true)
    } else if token_in == key.token_b {
        Ok(false)
    } else {
        Err(EngineError::UnknownToken(format!("#{}", token_in.0)))
    }
}

fn quote_from_plan(key: &PoolKey, plan: &SwapPlan) -> SwapQuote {
    let (token_in, token_out) = if plan.a_to_b {
        (key.token_a, key.token_b)
    } else {
        (key.token_b, key.token_a)
    };
    SwapQuote {
        token_in,
        token_out,
        amount_in: plan.amount_in,
        amount_out: plan.amount_out,
        fee_paid: plan.fee_paid,
        price_impact_bps: plan.price_impact_bps,
        crossed_ticks: plan.crossings.len() as u32,
    }
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> PoolKey {
        PoolKey {
            token_a: TokenId(0),
            token_b: TokenId(1),
            fee_bps: 25,
        }
    }

    fn funded_registry() -> TokenRegistry {
        let registry = TokenRegistry::new();
        registry.register("ETH", 18).unwrap();
        registry.register("USDC", 6).unwrap();
        registry
            .mint("alice", TokenId(0), 1_000_000_000_000_000_000)
            .unwrap();
        registry
    }

    fn pool_with_liquidity(engine: &PoolEngine, key: PoolKey) {
        engine.create_pool(key, Q64).unwrap();
        let state = engine.state(&key).unwrap();
        let mut guard = write_lock(&state);
        guard.modify_liquidity(-1_000, 1_000, 10_000_000_000_000).unwrap();
    }

    #[test]
    fn test_create_pool_duplicate_rejected() {
        let engine = PoolEngine::new();
        let key = test_key();
        engine.create_pool(key, Q64).unwrap();
        assert!(matches!(
            engine.create_pool(key, Q64),
            Err(EngineError::PoolAlreadyExists)
        ));
    }

    #[test]
    fn test_create_pool_rejects_bad_fee() {
        let engine = PoolEngine::new();
        let mut key = test_key();
        key.fee_bps = 0;
        assert!(engine.create_pool(key, Q64).is_err());
        key.fee_bps = 5_000;
        assert!(engine.create_pool(key, Q64).is_err());
    }

    #[test]
    fn test_quote_matches_execute() {
        let engine = PoolEngine::new();
        let key = test_key();
        pool_with_liquidity(&engine, key);

        let registry = TokenRegistry::new();
        registry.register("ETH", 18).unwrap();
        registry.register("USDC", 6).unwrap();
        registry.mint("alice", key.token_a, 10_000_000).unwrap();

        let quote = engine
            .quote_swap(&key, key.token_a, 1_000_000, 5_000)
            .unwrap();
        let executed = engine
            .execute_swap(&registry, &key, "alice", key.token_a, 1_000_000, 5_000, 0)
            .unwrap();
        assert_eq!(quote, executed);

        // A second identical quote now differs: state has moved.
        let after = engine
            .quote_swap(&key, key.token_a, 1_000_000, 5_000)
            .unwrap();
        assert!(after.amount_out <= executed.amount_out);
    }

    #[test]
    fn test_swap_settles_balances() {
        let engine = PoolEngine::new();
        let key = test_key();
        pool_with_liquidity(&engine, key);

        let registry = TokenRegistry::new();
        registry.register("ETH", 18).unwrap();
        registry.register("USDC", 6).unwrap();
        registry.mint("alice", key.token_a, 2_000_000).unwrap();

        let quote = engine
            .execute_swap(&registry, &key, "alice", key.token_a, 1_000_000, 5_000, 7)
            .unwrap();
        assert_eq!(registry.balance_of("alice", key.token_a), 1_000_000);
        assert_eq!(registry.balance_of("alice", key.token_b), quote.amount_out);

        let history = engine.trade_history(&key, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp, 7);
        assert_eq!(history[0].amount_out, quote.amount_out);
    }

    #[test]
    fn test_slippage_cap_enforced() {
        let engine = PoolEngine::new();
        let key = test_key();
        pool_with_liquidity(&engine, key);

        let registry = TokenRegistry::new();
        registry.register("ETH", 18).unwrap();
        registry.register("USDC", 6).unwrap();
        registry.mint("alice", key.token_a, 1_000_000).unwrap();

        // The 25 bps fee alone puts the impact above a 10 bps cap.
        assert!(matches!(
            engine.quote_swap(&key, key.token_a, 1_000_000, 10),
            Err(EngineError::SlippageExceeded { .. })
        ));
        let err = engine
            .execute_swap(&registry, &key, "alice", key.token_a, 1_000_000, 10, 0)
            .unwrap_err();
        assert!(matches!(err, EngineError::SlippageExceeded { .. }));
        // Failed swap leaves balances untouched.
        assert_eq!(registry.balance_of("alice", key.token_a), 1_000_000);
    }

    #[test]
    fn test_slippage_request_above_cap_rejected() {
        let engine = PoolEngine::new();
        let key = test_key();
        pool_with_liquidity(&engine, key);
        assert!(matches!(
            engine.quote_swap(&key, key.token_a, 1_000, 9_000),
            Err(EngineError::InvalidAmount)
        ));
    }

    #[test]
    fn test_swap_crosses_initialized_tick() {
        let engine = PoolEngine::new();
        let key = test_key();
        engine.create_pool(key, Q64).unwrap();
        let state = engine.state(&key).unwrap();
        {
            let mut guard = write_lock(&state);
            // Narrow inner range plus a wide backstop.
            guard.modify_liquidity(-100, 100, 1_000_000_000_000).unwrap();
            guard.modify_liquidity(-10_000, 10_000, 1_000_000_000_000).unwrap();
        }

        // Large enough to push the price below tick -100.
        let quote = engine
            .quote_swap(&key, key.token_a, 40_000_000_000, 5_000)
            .unwrap();
        assert!(quote.crossed_ticks >= 1);

        let registry = funded_registry();
        registry.mint("alice", key.token_a, 40_000_000_000).unwrap();
        engine
            .execute_swap(
                &registry,
                &key,
                "alice",
                key.token_a,
                40_000_000_000,
                5_000,
                0,
            )
            .unwrap();

        let pool = engine.pool(&key).unwrap();
        assert!(pool.current_tick < -100);
        // Only the wide range remains active below -100.
        assert_eq!(pool.liquidity, 1_000_000_000_000);
    }

    #[test]
    fn test_swap_through_liquidity_gap() {
        let engine = PoolEngine::new();
        let key = test_key();
        engine.create_pool(key, Q64).unwrap();
        let state = engine.state(&key).unwrap();
        {
            let mut guard = write_lock(&state);
            // Active range around the price and a disjoint range below.
            guard.modify_liquidity(-100, 100, 1_000_000_000_000).unwrap();
            guard.modify_liquidity(-10_000, -5_000, 1_000_000_000_000).unwrap();
        }

        let quote = engine
            .quote_swap(&key, key.token_a, 10_000_000_000, 5_000)
            .unwrap();
        // The walk jumped the [-5000, -100) gap and filled from below.
        assert!(quote.amount_out > 0);
        assert!(quote.crossed_ticks >= 2);
    }

    #[test]
    fn test_swap_without_liquidity_fails() {
        let engine = PoolEngine::new();
        let key = test_key();
        engine.create_pool(key, Q64).unwrap();
        assert!(matches!(
            engine.quote_swap(&key, key.token_a, 1_000, 5_000),
            Err(EngineError::Core(CoreError::InsufficientLiquidity))
        ));
    }

    #[test]
    fn test_fee_growth_accrues_to_global() {
        let engine = PoolEngine::new();
        let key = test_key();
        pool_with_liquidity(&engine, key);

        let registry = funded_registry();
        registry.mint("alice", key.token_a, 1_000_000).unwrap();
        engine
            .execute_swap(&registry, &key, "alice", key.token_a, 1_000_000, 5_000, 0)
            .unwrap();

        let pool = engine.pool(&key).unwrap();
        assert!(pool.fee_growth_global_a_x64 > 0);
        assert_eq!(pool.fee_growth_global_b_x64, 0);
        assert!(pool.collected_fees_a > 0);
    }

    #[test]
    fn test_unknown_token_rejected() {
        let engine = PoolEngine::new();
        let key = test_key();
        pool_with_liquidity(&engine, key);
        assert!(matches!(
            engine.quote_swap(&key, TokenId(9), 1_000, 5_000),
            Err(EngineError::UnknownToken(_))
        ));
    }

    proptest::proptest! {
        #[test]
        fn prop_quote_fee_and_output_bounded(amount in 1_000u64..100_000_000) {
            let engine = PoolEngine::new();
            let key = test_key();
            pool_with_liquidity(&engine, key);

            let quote = engine.quote_swap(&key, key.token_a, amount, 5_000).unwrap();
            proptest::prop_assert_eq!(quote.amount_in, amount);
            proptest::prop_assert!(quote.fee_paid <= amount);
            // 25 bps fee, rounded against the trader.
            proptest::prop_assert!(quote.fee_paid >= amount / 400);
        }

        #[test]
        fn prop_output_monotone_in_input(
            smaller in 1_000u64..50_000_000,
            extra in 1u64..50_000_000,
        ) {
            let engine = PoolEngine::new();
            let key = test_key();
            pool_with_liquidity(&engine, key);

            let small = engine.quote_swap(&key, key.token_a, smaller, 5_000).unwrap();
            let large = engine
                .quote_swap(&key, key.token_a, smaller + extra, 5_000)
                .unwrap();
            proptest::prop_assert!(large.amount_out >= small.amount_out);
        }
    }

    #[test]
    fn test_close_range_returns_no_more_than_deposited() {
        let engine = PoolEngine::new();
        let key = test_key();
        engine.create_pool(key, Q64).unwrap();
        let state = engine.state(&key).unwrap();
        let mut guard = write_lock(&state);

        let (in_a, in_b) = guard.modify_liquidity(-500, 500, 123_456_789_012).unwrap();
        let (out_a, out_b) = guard.modify_liquidity(-500, 500, -123_456_789_012).unwrap();
        assert!(out_a <= in_a);
        assert!(out_b <= in_b);
        assert_eq!(guard.liquidity, 0);
        assert!(guard.ticks.is_empty());
    }
}
