//! # Command Journal
//!
//! Append-only persistence: every state-changing command is written as
//! one JSON line after it succeeds. Restart reconstruction replays the
//! journal in order against a fresh engine; commands are deterministic
//! given the same event sequence, so replay converges on the pre-restart
//! state.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use fluxswap_core::types::{PoolKey, ProposalAction, TokenId, VoteDirection};

use crate::errors::{EngineError, EngineResult};

/// One state-changing command, as journaled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEvent {
    RegisterToken {
        symbol: String,
        decimals: u8,
    },
    Mint {
        owner: String,
        token: TokenId,
        amount: u64,
    },
    CreatePool {
        key: PoolKey,
        sqrt_price_x64: u128,
    },
    ExecuteSwap {
        key: PoolKey,
        trader: String,
        token_in: TokenId,
        amount_in: u64,
        max_slippage_bps: u16,
        timestamp: i64,
    },
    OpenPosition {
        key: PoolKey,
        owner: String,
        tick_lower: i32,
        tick_upper: i32,
        amount_a_desired: u64,
        amount_b_desired: u64,
    },
    CollectFees {
        position_id: u64,
        caller: String,
    },
    ClosePosition {
        position_id: u64,
        caller: String,
    },
    CreateProposal {
        proposer: String,
        title: String,
        description: String,
        voting_duration_days: Option<u32>,
        min_voting_power: u128,
        action: Option<ProposalAction>,
        timestamp: i64,
    },
    CastVote {
        proposal_id: u64,
        voter: String,
        direction: VoteDirection,
        timestamp: i64,
    },
    FinalizeProposal {
        proposal_id: u64,
        timestamp: i64,
    },
    Follow {
        follower: String,
        leader: String,
        ratio_bps: u16,
    },
    Unfollow {
        follower: String,
    },
}

/// Append handle over the journal file
pub struct Journal {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl Journal {
    /// Open (creating if missing) a journal for appending
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| EngineError::Journal(format!("create {}: {e}", parent.display())))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EngineError::Journal(format!("open {}: {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Append one event and flush it to disk
    pub fn append(&self, event: &JournalEvent) -> EngineResult<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| EngineError::Journal(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush())
            .map_err(|e| EngineError::Journal(format!("append {}: {e}", self.path.display())))
    }

    /// Read every journaled event in order. A malformed final line is
    /// dropped as a torn write; a malformed line elsewhere is an error.
    pub fn read_all(path: &Path) -> EngineResult<Vec<JournalEvent>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)
            .map_err(|e| EngineError::Journal(format!("open {}: {e}", path.display())))?;
        let reader = BufReader::new(file);
        let lines: Vec<String> = reader
            .lines()
            .collect::<Result<_, _>>()
            .map_err(|e| EngineError::Journal(format!("read {}: {e}", path.display())))?;

        let mut events = Vec::with_capacity(lines.len());
        let last = lines.len().saturating_sub(1);
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(event) => events.push(event),
                Err(e) if index == last => {
                    warn!(line = index + 1, %e, "dropping torn final journal line");
                }
                Err(e) => {
                    return Err(EngineError::Journal(format!(
                        "{} line {}: {e}",
                        path.display(),
                        index + 1
                    )));
                }
            }
        }
        Ok(events)
    }
}
