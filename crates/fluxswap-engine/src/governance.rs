//! # Governance Engine
//!
//! Proposal lifecycle and treasury ledger. Voting power is the voter's
//! balance of the governance token sampled when the vote is cast, so a
//! re-vote after a balance change counts the new balance; each voter
//! holds at most one live vote per proposal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::info;

use fluxswap_core::types::{
    Proposal, ProposalAction, ProposalStatus, TreasuryTransaction, Vote, VoteDirection,
};

use crate::config::GovernanceConfig;
use crate::errors::{EngineError, EngineResult};
use crate::pool::{read_lock, write_lock};
use crate::registry::TokenRegistry;

/// Account that receives proposal charges and backs treasury actions
pub const TREASURY_ACCOUNT: &str = "treasury";

struct ProposalSlot {
    proposal: Proposal,
    votes: HashMap<String, Vote>,
}

pub struct GovernanceEngine {
    config: GovernanceConfig,
    proposals: RwLock<HashMap<u64, Arc<Mutex<ProposalSlot>>>>,
    treasury_log: RwLock<Vec<TreasuryTransaction>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl GovernanceEngine {
    pub fn new(config: GovernanceConfig) -> Self {
        Self {
            config,
            proposals: RwLock::new(HashMap::new()),
            treasury_log: RwLock::new(Vec::new()),
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Create a proposal. The proposer must hold at least the proposal
    /// cost in governance tokens; the cost is transferred to the
    /// treasury.
    #[allow(clippy::too_many_arguments)]
    pub fn create_proposal(
        &self,
        registry: &TokenRegistry,
        proposer: &str,
        title: &str,
        description: &str,
        voting_duration_days: Option<u32>,
        min_voting_power: u128,
        action: Option<ProposalAction>,
        now: i64,
    ) -> EngineResult<Proposal> {
        let token = registry.resolve(&self.config.voting_token)?;
        let have = registry.balance_of(proposer, token);
        if have < self.config.proposal_cost {
            return Err(EngineError::InsufficientPower {
                have,
                need: self.config.proposal_cost,
            });
        }
        if let Some(ref payload) = action {
            if payload.amount == 0 {
                return Err(EngineError::InvalidTreasuryAction);
            }
            registry.token(payload.token).map_err(|_| EngineError::InvalidTreasuryAction)?;
        }

        registry.transfer(proposer, TREASURY_ACCOUNT, token, self.config.proposal_cost)?;

        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let proposal = Proposal {
            id,
            title: title.to_string(),
            description: description.to_string(),
            voting_duration_days: voting_duration_days
                .unwrap_or(self.config.default_voting_duration_days),
            min_voting_power,
            created_at: now,
            status: ProposalStatus::Active,
            votes_for: 0,
            votes_against: 0,
            total_power_snapshot: registry.total_supply(token),
            action,
        };
        write_lock(&self.proposals).insert(
            id,
            Arc::new(Mutex::new(ProposalSlot {
                proposal: proposal.clone(),
                votes: HashMap::new(),
            })),
        );
        info!(proposer, proposal_id = id, title, "created proposal");
        Ok(proposal)
    }

    /// Cast or replace a vote. Power is re-sampled from the voter's
    /// current balance; a replaced vote's previous power is removed from
    /// its old tally first.
    pub fn cast_vote(
        &self,
        registry: &TokenRegistry,
        proposal_id: u64,
        voter: &str,
        direction: VoteDirection,
        now: i64,
    ) -> EngineResult<Proposal> {
        let slot = self.slot(proposal_id)?;
        let mut slot = lock(&slot);
        if slot.proposal.status != ProposalStatus::Active || now >= slot.proposal.deadline() {
            return Err(EngineError::ProposalNotActive);
        }

        let token = registry.resolve(&self.config.voting_token)?;
        let power = registry.balance_of(voter, token);
        if power == 0 {
            return Err(EngineError::InsufficientPower { have: 0, need: 1 });
        }

        if let Some(previous) = slot.votes.remove(voter) {
            match previous.direction {
                VoteDirection::For => slot.proposal.votes_for -= previous.power as u128,
                VoteDirection::Against => slot.proposal.votes_against -= previous.power as u128,
            }
        }
        match direction {
            VoteDirection::For => slot.proposal.votes_for += power as u128,
            VoteDirection::Against => slot.proposal.votes_against += power as u128,
        }
        slot.votes.insert(
            voter.to_string(),
            Vote {
                proposal_id,
                voter: voter.to_string(),
                power,
                direction,
            },
        );

        info!(voter, proposal_id, power, ?direction, "cast vote");
        Ok(slot.proposal.clone())
    }

    /// Finalize a proposal at or after its deadline. Quorum failures
    /// expire the proposal; otherwise a strict majority of cast power
    /// passes it. Finalizing a settled proposal returns it unchanged.
    pub fn finalize(&self, proposal_id: u64, now: i64) -> EngineResult<Proposal> {
        let slot = self.slot(proposal_id)?;
        let mut slot = lock(&slot);
        if slot.proposal.status != ProposalStatus::Active {
            return Ok(slot.proposal.clone());
        }
        if now < slot.proposal.deadline() {
            return Err(EngineError::ProposalNotActive);
        }

        let status = if slot.proposal.total_votes() < slot.proposal.min_voting_power {
            ProposalStatus::Expired
        } else if slot.proposal.votes_for > slot.proposal.votes_against {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Rejected
        };
        slot.proposal.status = status;

        if status == ProposalStatus::Passed {
            if let Some(ref action) = slot.proposal.action {
                write_lock(&self.treasury_log).push(TreasuryTransaction {
                    kind: action.kind,
                    amount: action.amount,
                    token: action.token,
                    timestamp: now,
                });
            }
        }

        info!(proposal_id, ?status, "finalized proposal");
        Ok(slot.proposal.clone())
    }

    /// Look up a proposal by id
    pub fn proposal(&self, proposal_id: u64) -> EngineResult<Proposal> {
        let slot = self.slot(proposal_id)?;
        let slot = lock(&slot);
        Ok(slot.proposal.clone())
    }

    /// All proposals, ordered by id
    pub fn proposals(&self) -> Vec<Proposal> {
        let mut result: Vec<Proposal> = read_lock(&self.proposals)
            .values()
            .map(|slot| lock(slot).proposal.clone())
            .collect();
        result.sort_by_key(|p| p.id);
        result
    }

    /// Treasury ledger, oldest first
    pub fn treasury_transactions(&self) -> Vec<TreasuryTransaction> {
        read_lock(&self.treasury_log).clone()
    }

    fn slot(&self, proposal_id: u64) -> EngineResult<Arc<Mutex<ProposalSlot>>> {
        read_lock(&self.proposals)
            .get(&proposal_id)
            .cloned()
            .ok_or(EngineError::ProposalNotFound(proposal_id))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
