//! # Token Registry
//!
//! Canonical token metadata plus the balance book every engine settles
//! against. Swaps, deposits, fee collection, and governance charges all
//! move balances here, so conservation can be checked across the whole
//! system.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use fluxswap_core::types::{Token, TokenId};

use crate::errors::{EngineError, EngineResult};

#[derive(Default)]
struct RegistryInner {
    tokens: Vec<Token>,
    by_symbol: HashMap<String, TokenId>,
    /// owner -> balance, per token
    balances: HashMap<TokenId, HashMap<String, u64>>,
    total_supply: HashMap<TokenId, u128>,
}

/// Thread-safe token registry and balance book
#[derive(Default)]
pub struct TokenRegistry {
    inner: RwLock<RegistryInner>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new token. Symbols are unique; metadata is immutable
    /// once registered.
    pub fn register(&self, symbol: &str, decimals: u8) -> EngineResult<TokenId> {
        let mut inner = self.write();
        if inner.by_symbol.contains_key(symbol) {
            return Err(EngineError::TokenAlreadyExists(symbol.to_string()));
        }
        let id = TokenId(inner.tokens.len() as u32);
        inner.tokens.push(Token {
            id,
            symbol: symbol.to_string(),
            decimals,
        });
        inner.by_symbol.insert(symbol.to_string(), id);
        debug!(symbol, decimals, token_id = id.0, "registered token");
        Ok(id)
    }

    /// Look up token metadata by id
    pub fn token(&self, id: TokenId) -> EngineResult<Token> {
        self.read()
            .tokens
            .get(id.0 as usize)
            .cloned()
            .ok_or_else(|| EngineError::UnknownToken(format!("#{}", id.0)))
    }

    /// Resolve a symbol to its token id
    pub fn resolve(&self, symbol: &str) -> EngineResult<TokenId> {
        self.read()
            .by_symbol
            .get(symbol)
            .copied()
            .ok_or_else(|| EngineError::UnknownToken(symbol.to_string()))
    }

    /// All registered tokens, in registration order
    pub fn tokens(&self) -> Vec<Token> {
        self.read().tokens.clone()
    }

    /// Create `amount` units of `token` in `owner`'s account
    pub fn mint(&self, owner: &str, token: TokenId, amount: u64) -> EngineResult<()> {
        self.token(token)?;
        let mut inner = self.write();
        let balance = inner
            .balances
            .entry(token)
            .or_default()
            .entry(owner.to_string())
            .or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(fluxswap_core::CoreError::Overflow)?;
        *inner.total_supply.entry(token).or_insert(0) += amount as u128;
        Ok(())
    }

    /// Remove `amount` units of `token` from `owner`'s account
    pub fn burn(&self, owner: &str, token: TokenId, amount: u64) -> EngineResult<()> {
        let mut inner = self.write();
        let balance = inner
            .balances
            .entry(token)
            .or_default()
            .entry(owner.to_string())
            .or_insert(0);
        if *balance < amount {
            return Err(EngineError::InsufficientBalance {
                have: *balance,
                need: amount,
            });
        }
        *balance -= amount;
        *inner.total_supply.entry(token).or_insert(0) -= amount as u128;
        Ok(())
    }

    /// Move `amount` units of `token` between accounts
    pub fn transfer(&self, from: &str, to: &str, token: TokenId, amount: u64) -> EngineResult<()> {
        let mut inner = self.write();
        let balances = inner.balances.entry(token).or_default();
        let from_balance = balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(EngineError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }
        let to_balance = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(fluxswap_core::CoreError::Overflow)?;
        balances.insert(from.to_string(), from_balance - amount);
        balances.insert(to.to_string(), to_balance);
        Ok(())
    }

    /// Current balance of `owner` in `token`
    pub fn balance_of(&self, owner: &str, token: TokenId) -> u64 {
        self.read()
            .balances
            .get(&token)
            .and_then(|per_owner| per_owner.get(owner))
            .copied()
            .unwrap_or(0)
    }

    /// Total minted-minus-burned supply of `token`
    pub fn total_supply(&self, token: TokenId) -> u128 {
        self.read().total_supply.get(&token).copied().unwrap_or(0)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let registry = TokenRegistry::new();
        let eth = registry.register("ETH", 18).unwrap();
        let usdc = registry.register("USDC", 6).unwrap();
        assert_eq!(registry.resolve("ETH").unwrap(), eth);
        assert_eq!(registry.token(usdc).unwrap().decimals, 6);
        assert!(matches!(
            registry.resolve("DOGE"),
            Err(EngineError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let registry = TokenRegistry::new();
        registry.register("FLUX", 6).unwrap();
        assert!(matches!(
            registry.register("FLUX", 9),
            Err(EngineError::TokenAlreadyExists(_))
        ));
    }

    #[test]
    fn test_mint_transfer_burn() {
        let registry = TokenRegistry::new();
        let flux = registry.register("FLUX", 6).unwrap();
        registry.mint("alice", flux, 1_000).unwrap();
        registry.transfer("alice", "bob", flux, 400).unwrap();
        assert_eq!(registry.balance_of("alice", flux), 600);
        assert_eq!(registry.balance_of("bob", flux), 400);
        assert_eq!(registry.total_supply(flux), 1_000);

        registry.burn("bob", flux, 400).unwrap();
        assert_eq!(registry.total_supply(flux), 600);
        assert!(matches!(
            registry.burn("bob", flux, 1),
            Err(EngineError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let registry = TokenRegistry::new();
        let flux = registry.register("FLUX", 6).unwrap();
        registry.mint("alice", flux, 10).unwrap();
        let err = registry.transfer("alice", "bob", flux, 11).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientBalance { have: 10, need: 11 }
        );
        assert_eq!(registry.balance_of("alice", flux), 10);
    }
}
