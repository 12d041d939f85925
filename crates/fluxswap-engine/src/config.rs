//! Configuration for the FluxSwap engines.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use fluxswap_core::constants::{DEFAULT_SLIPPAGE_BPS, MAX_SLIPPAGE_BPS};

use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub swap: SwapConfig,
    pub governance: GovernanceConfig,
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Price-impact cap in basis points applied when the caller does
    /// not supply one
    pub default_slippage_bps: u16,
    /// Smallest liquidity a new position may carry
    pub min_position_liquidity: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Symbol of the token whose balances count as voting power
    pub voting_token: String,
    /// Voting power required to create a proposal, in raw token units
    pub proposal_cost: u64,
    /// Voting window applied when a proposal does not specify one
    pub default_voting_duration_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Append-only command journal; `None` disables persistence
    pub journal_path: Option<PathBuf>,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
            min_position_liquidity: 1_000,
        }
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            voting_token: "FLUX".to_string(),
            proposal_cost: 100_000_000,
            default_voting_duration_days: 7,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { journal_path: None }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("read {path}: {e}")))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> EngineResult<()> {
        if self.swap.default_slippage_bps as u64 > MAX_SLIPPAGE_BPS {
            return Err(EngineError::Config(format!(
                "default_slippage_bps {} exceeds maximum {}",
                self.swap.default_slippage_bps, MAX_SLIPPAGE_BPS
            )));
        }
        if self.swap.min_position_liquidity == 0 {
            return Err(EngineError::Config(
                "min_position_liquidity must be positive".to_string(),
            ));
        }
        if self.governance.voting_token.is_empty() {
            return Err(EngineError::Config(
                "voting_token cannot be empty".to_string(),
            ));
        }
        if self.governance.default_voting_duration_days == 0 {
            return Err(EngineError::Config(
                "default_voting_duration_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
