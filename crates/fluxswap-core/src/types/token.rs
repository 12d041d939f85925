//! Token metadata.

use serde::{Deserialize, Serialize};

/// Registry-assigned token identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TokenId(pub u32);

/// Canonical token metadata, immutable once registered.
///
/// `decimals` defines the fixed-point scaling for every amount of this
/// token; settlement paths never use floating point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    /// One whole unit in raw fixed-point amount
    pub fn one(&self) -> u64 {
        10u64.pow(self.decimals as u32)
    }
}
