//! Governance value types: proposals, votes, treasury ledger entries.

use serde::{Deserialize, Serialize};

use crate::types::token::TokenId;

/// Lifecycle of a proposal. Transitions happen only through the
/// governance engine: `Active -> Passed | Rejected` on a finalize at or
/// after the deadline with quorum reached, `Active -> Expired` when
/// quorum was never reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Active,
    Passed,
    Rejected,
    Expired,
}

/// Direction of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDirection {
    For,
    Against,
}

/// Allow-listed treasury action kinds a proposal may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreasuryAction {
    AllocateFunds,
    PurchaseAsset,
    DistributeFunds,
}

/// A governance proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub voting_duration_days: u32,
    /// Quorum: minimum total voting power that must participate
    pub min_voting_power: u128,
    /// Unix seconds
    pub created_at: i64,
    pub status: ProposalStatus,
    pub votes_for: u128,
    pub votes_against: u128,
    /// Total circulating voting power at creation time
    pub total_power_snapshot: u128,
    /// Treasury transfer to record if the proposal passes
    pub action: Option<ProposalAction>,
}

/// Treasury payload attached to a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAction {
    pub kind: TreasuryAction,
    pub token: TokenId,
    pub amount: u64,
}

impl Proposal {
    /// Voting deadline in unix seconds
    pub fn deadline(&self) -> i64 {
        self.created_at + self.voting_duration_days as i64 * crate::constants::SECONDS_PER_DAY
    }

    /// Total voting power cast so far
    pub fn total_votes(&self) -> u128 {
        self.votes_for + self.votes_against
    }
}

/// A cast vote; at most one per (proposal, voter), later votes overwrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub proposal_id: u64,
    pub voter: String,
    pub power: u64,
    pub direction: VoteDirection,
}

/// Append-only treasury ledger entry, written only when a passed
/// proposal carries an allow-listed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryTransaction {
    pub kind: TreasuryAction,
    pub amount: u64,
    pub token: TokenId,
    pub timestamp: i64,
}
