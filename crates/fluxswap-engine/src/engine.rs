//! # FluxSwap Facade
//!
//! Composes the registry, pool engine, position manager, governance and
//! copy trading behind one entry point, and owns persistence: every
//! successful state-changing command is appended to the journal, and
//! opening an engine over an existing journal replays it to reconstruct
//! state.

use std::path::Path;

use tracing::info;

use fluxswap_core::types::{
    Pool, PoolKey, Position, Proposal, ProposalAction, SwapQuote, Token, TokenId, TradeRecord,
    TreasuryTransaction, VoteDirection,
};

use crate::config::EngineConfig;
use crate::copy_trading::{CopyFill, CopyTradingLedger};
use crate::errors::{EngineError, EngineResult};
use crate::governance::GovernanceEngine;
use crate::journal::{Journal, JournalEvent};
use crate::pool::PoolEngine;
use crate::position::{CloseOutcome, PositionManager};
use crate::registry::TokenRegistry;

/// Result of an executed swap: the leader's fill plus any mirrored fills
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub quote: SwapQuote,
    pub mirrored: Vec<CopyFill>,
}

pub struct FluxSwap {
    config: EngineConfig,
    registry: TokenRegistry,
    pools: PoolEngine,
    positions: PositionManager,
    governance: GovernanceEngine,
    copy_trading: CopyTradingLedger,
    journal: Option<Journal>,
}

impl FluxSwap {
    /// Build an engine from configuration. When a journal path is
    /// configured, existing events are replayed before the engine
    /// accepts new commands.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let mut engine = Self {
            registry: TokenRegistry::new(),
            pools: PoolEngine::new(),
            positions: PositionManager::new(),
            governance: GovernanceEngine::new(config.governance.clone()),
            copy_trading: CopyTradingLedger::new(),
            journal: None,
            config,
        };

        if let Some(path) = engine.config.persistence.journal_path.clone() {
            engine.replay(&path)?;
            engine.journal = Some(Journal::open(&path)?);
        }
        Ok(engine)
    }

    fn replay(&mut self, path: &Path) -> EngineResult<()> {
        let events = Journal::read_all(path)?;
        let count = events.len();
        for event in events {
            self.apply(&event).map_err(|e| {
                EngineError::Journal(format!("replay failed for {event:?}: {e}"))
            })?;
        }
        if count > 0 {
            info!(events = count, path = %path.display(), "journal replayed");
        }
        Ok(())
    }

    /// Apply one journaled command without re-journaling it. Replay of a
    /// command that once succeeded is expected to succeed again.
    fn apply(&self, event: &JournalEvent) -> EngineResult<()> {
        match event.clone() {
            JournalEvent::RegisterToken { symbol, decimals } => {
                self.registry.register(&symbol, decimals)?;
            }
            JournalEvent::Mint {
                owner,
                token,
                amount,
            } => self.registry.mint(&owner, token, amount)?,
            JournalEvent::CreatePool { key, sqrt_price_x64 } => {
                self.pools.create_pool(key, sqrt_price_x64)?;
            }
            JournalEvent::ExecuteSwap {
                key,
                trader,
                token_in,
                amount_in,
                max_slippage_bps,
                timestamp,
            } => {
                self.execute_swap_inner(
                    &key,
                    &trader,
                    token_in,
                    amount_in,
                    max_slippage_bps,
                    timestamp,
                )?;
            }
            JournalEvent::OpenPosition {
                key,
                owner,
                tick_lower,
                tick_upper,
                amount_a_desired,
                amount_b_desired,
            } => {
                self.positions.open_position(
                    &self.pools,
                    &self.registry,
                    key,
                    &owner,
                    tick_lower,
                    tick_upper,
                    amount_a_desired,
                    amount_b_desired,
                    self.config.swap.min_position_liquidity,
                )?;
            }
            JournalEvent::CollectFees {
                position_id,
                caller,
            } => {
                self.positions
                    .collect_fees(&self.pools, &self.registry, position_id, &caller)?;
            }
            JournalEvent::ClosePosition {
                position_id,
                caller,
            } => {
                self.positions
                    .close_position(&self.pools, &self.registry, position_id, &caller)?;
            }
            JournalEvent::CreateProposal {
                proposer,
                title,
                description,
                voting_duration_days,
                min_voting_power,
                action,
                timestamp,
            } => {
                self.governance.create_proposal(
                    &self.registry,
                    &proposer,
                    &title,
                    &description,
                    voting_duration_days,
                    min_voting_power,
                    action,
                    timestamp,
                )?;
            }
            JournalEvent::CastVote {
                proposal_id,
                voter,
                direction,
                timestamp,
            } => {
                self.governance
                    .cast_vote(&self.registry, proposal_id, &voter, direction, timestamp)?;
            }
            JournalEvent::FinalizeProposal {
                proposal_id,
                timestamp,
            } => {
                self.governance.finalize(proposal_id, timestamp)?;
            }
            JournalEvent::Follow {
                follower,
                leader,
                ratio_bps,
            } => self.copy_trading.follow(&follower, &leader, ratio_bps)?,
            JournalEvent::Unfollow { follower } => self.copy_trading.unfollow(&follower),
        }
        Ok(())
    }

    fn journal(&self, event: JournalEvent) -> EngineResult<()> {
        match &self.journal {
            Some(journal) => journal.append(&event),
            None => Ok(()),
        }
    }

    // ---- tokens ----

    pub fn register_token(&self, symbol: &str, decimals: u8) -> EngineResult<TokenId> {
        let id = self.registry.register(symbol, decimals)?;
        self.journal(JournalEvent::RegisterToken {
            symbol: symbol.to_string(),
            decimals,
        })?;
        Ok(id)
    }

    pub fn mint(&self, owner: &str, token: TokenId, amount: u64) -> EngineResult<()> {
        self.registry.mint(owner, token, amount)?;
        self.journal(JournalEvent::Mint {
            owner: owner.to_string(),
            token,
            amount,
        })
    }

    pub fn tokens(&self) -> Vec<Token> {
        self.registry.tokens()
    }

    pub fn balance_of(&self, owner: &str, token: TokenId) -> u64 {
        self.registry.balance_of(owner, token)
    }

    // ---- pools and swaps ----

    pub fn create_pool(&self, key: PoolKey, sqrt_price_x64: u128) -> EngineResult<Pool> {
        let pool = self.pools.create_pool(key, sqrt_price_x64)?;
        self.journal(JournalEvent::CreatePool {
            key,
            sqrt_price_x64,
        })?;
        Ok(pool)
    }

    pub fn pool(&self, key: &PoolKey) -> EngineResult<Pool> {
        self.pools.pool(key)
    }

    pub fn pools(&self) -> Vec<Pool> {
        self.pools.pools()
    }

    /// Quote a swap without moving state. When no cap is given, the
    /// configured default slippage applies.
    pub fn quote_swap(
        &self,
        key: &PoolKey,
        token_in: TokenId,
        amount_in: u64,
        max_slippage_bps: Option<u16>,
    ) -> EngineResult<SwapQuote> {
        self.pools
            .quote_swap(key, token_in, amount_in, self.resolve_slippage(max_slippage_bps))
    }

    /// Execute a swap. The price impact must stay within the cap (or the
    /// configured default when none is given). The trader's fill is
    /// mirrored to any followers afterwards.
    pub fn execute_swap(
        &self,
        key: &PoolKey,
        trader: &str,
        token_in: TokenId,
        amount_in: u64,
        max_slippage_bps: Option<u16>,
        timestamp: i64,
    ) -> EngineResult<SwapOutcome> {
        let max_slippage_bps = self.resolve_slippage(max_slippage_bps);
        let outcome =
            self.execute_swap_inner(key, trader, token_in, amount_in, max_slippage_bps, timestamp)?;
        self.journal(JournalEvent::ExecuteSwap {
            key: *key,
            trader: trader.to_string(),
            token_in,
            amount_in,
            max_slippage_bps,
            timestamp,
        })?;
        Ok(outcome)
    }

    fn resolve_slippage(&self, max_slippage_bps: Option<u16>) -> u16 {
        max_slippage_bps.unwrap_or(self.config.swap.default_slippage_bps)
    }

    fn execute_swap_inner(
        &self,
        key: &PoolKey,
        trader: &str,
        token_in: TokenId,
        amount_in: u64,
        max_slippage_bps: u16,
        timestamp: i64,
    ) -> EngineResult<SwapOutcome> {
        let quote = self.pools.execute_swap(
            &self.registry,
            key,
            trader,
            token_in,
            amount_in,
            max_slippage_bps,
            timestamp,
        )?;
        let mirrored = self.copy_trading.mirror_swap(
            &self.pools,
            &self.registry,
            key,
            trader,
            token_in,
            amount_in,
            max_slippage_bps,
            timestamp,
        );
        Ok(SwapOutcome { quote, mirrored })
    }

    pub fn trade_history(&self, key: &PoolKey, limit: usize) -> EngineResult<Vec<TradeRecord>> {
        self.pools.trade_history(key, limit)
    }

    // ---- positions ----

    #[allow(clippy::too_many_arguments)]
    pub fn open_position(
        &self,
        key: PoolKey,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        amount_a_desired: u64,
        amount_b_desired: u64,
    ) -> EngineResult<Position> {
        let position = self.positions.open_position(
            &self.pools,
            &self.registry,
            key,
            owner,
            tick_lower,
            tick_upper,
            amount_a_desired,
            amount_b_desired,
            self.config.swap.min_position_liquidity,
        )?;
        self.journal(JournalEvent::OpenPosition {
            key,
            owner: owner.to_string(),
            tick_lower,
            tick_upper,
            amount_a_desired,
            amount_b_desired,
        })?;
        Ok(position)
    }

    pub fn collect_fees(&self, position_id: u64, caller: &str) -> EngineResult<(u64, u64)> {
        let collected =
            self.positions
                .collect_fees(&self.pools, &self.registry, position_id, caller)?;
        self.journal(JournalEvent::CollectFees {
            position_id,
            caller: caller.to_string(),
        })?;
        Ok(collected)
    }

    pub fn close_position(&self, position_id: u64, caller: &str) -> EngineResult<CloseOutcome> {
        let outcome =
            self.positions
                .close_position(&self.pools, &self.registry, position_id, caller)?;
        self.journal(JournalEvent::ClosePosition {
            position_id,
            caller: caller.to_string(),
        })?;
        Ok(outcome)
    }

    pub fn position(&self, position_id: u64) -> EngineResult<Position> {
        self.positions.position(position_id)
    }

    pub fn positions_of(&self, owner: &str) -> Vec<Position> {
        self.positions.positions_of(owner)
    }

    // ---- governance ----

    #[allow(clippy::too_many_arguments)]
    pub fn create_proposal(
        &self,
        proposer: &str,
        title: &str,
        description: &str,
        voting_duration_days: Option<u32>,
        min_voting_power: u128,
        action: Option<ProposalAction>,
        timestamp: i64,
    ) -> EngineResult<Proposal> {
        let proposal = self.governance.create_proposal(
            &self.registry,
            proposer,
            title,
            description,
            voting_duration_days,
            min_voting_power,
            action.clone(),
            timestamp,
        )?;
        self.journal(JournalEvent::CreateProposal {
            proposer: proposer.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            voting_duration_days,
            min_voting_power,
            action,
            timestamp,
        })?;
        Ok(proposal)
    }

    pub fn cast_vote(
        &self,
        proposal_id: u64,
        voter: &str,
        direction: VoteDirection,
        timestamp: i64,
    ) -> EngineResult<Proposal> {
        let proposal =
            self.governance
                .cast_vote(&self.registry, proposal_id, voter, direction, timestamp)?;
        self.journal(JournalEvent::CastVote {
            proposal_id,
            voter: voter.to_string(),
            direction,
            timestamp,
        })?;
        Ok(proposal)
    }

    pub fn finalize_proposal(&self, proposal_id: u64, timestamp: i64) -> EngineResult<Proposal> {
        let proposal = self.governance.finalize(proposal_id, timestamp)?;
        self.journal(JournalEvent::FinalizeProposal {
            proposal_id,
            timestamp,
        })?;
        Ok(proposal)
    }

    pub fn proposal(&self, proposal_id: u64) -> EngineResult<Proposal> {
        self.governance.proposal(proposal_id)
    }

    pub fn proposals(&self) -> Vec<Proposal> {
        self.governance.proposals()
    }

    pub fn treasury_transactions(&self) -> Vec<TreasuryTransaction> {
        self.governance.treasury_transactions()
    }

    // ---- copy trading ----

    pub fn follow(&self, follower: &str, leader: &str, ratio_bps: u16) -> EngineResult<()> {
        self.copy_trading.follow(follower, leader, ratio_bps)?;
        self.journal(JournalEvent::Follow {
            follower: follower.to_string(),
            leader: leader.to_string(),
            ratio_bps,
        })
    }

    pub fn unfollow(&self, follower: &str) -> EngineResult<()> {
        self.copy_trading.unfollow(follower);
        self.journal(JournalEvent::Unfollow {
            follower: follower.to_string(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
