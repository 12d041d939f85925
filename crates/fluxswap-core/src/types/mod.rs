//! Value types shared across the FluxSwap engines.

pub mod governance;
pub mod pool;
pub mod position;
pub mod quote;
pub mod token;

pub use governance::{
    Proposal, ProposalAction, ProposalStatus, TreasuryAction, TreasuryTransaction, Vote,
    VoteDirection,
};
pub use pool::{Pool, PoolKey};
pub use position::Position;
pub use quote::{SwapQuote, TradeRecord};
pub use token::{Token, TokenId};
