//! # FluxSwap Engine
//!
//! Stateful protocol engines built on `fluxswap-core`: the token
//! registry and balance book, concentrated-liquidity pools with the
//! tick-walking swap path, liquidity position management, governance
//! with a treasury ledger, copy trading, and journal-based persistence.
//!
//! Concurrency model: every pool is guarded by its own `RwLock` and all
//! mutations go through the write side, so there is exactly one writer
//! per pool at any time while quotes proceed concurrently on the read
//! side.

pub mod config;
pub mod copy_trading;
pub mod engine;
pub mod errors;
pub mod governance;
pub mod journal;
pub mod pool;
pub mod position;
pub mod registry;

pub use config::EngineConfig;
pub use copy_trading::{CopyFill, CopyTradingLedger, FollowConfig};
pub use engine::{FluxSwap, SwapOutcome};
pub use errors::{EngineError, EngineResult};
pub use governance::{GovernanceEngine, TREASURY_ACCOUNT};
pub use journal::{Journal, JournalEvent};
pub use pool::{PoolEngine, PoolState, TickMeta};
pub use position::{CloseOutcome, PositionManager};
pub use registry::TokenRegistry;
