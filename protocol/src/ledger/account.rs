//! # Accounts
//!
//! An account is the balance of one owner in one token kind. The pair
//! `(owner, token)` is the [`AccountId`]; a vault's custody of token `T`
//! and its native balance are two different accounts with the same owner.
//!
//! Each account carries a `version` that settlement bumps on every commit
//! touching it. Contracts pin the version they read; if it moved before
//! their transaction commits, the transaction is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::token::TokenId;
use crate::crypto::Address;

/// Identifies an account: an owner in a token kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId {
    /// Who owns the balance.
    pub owner: Address,
    /// Which token kind the balance is denominated in.
    pub token: TokenId,
}

impl AccountId {
    /// Builds an account id.
    pub const fn new(owner: Address, token: TokenId) -> Self {
        Self { owner, token }
    }

    /// The owner's native-asset account.
    pub const fn native(owner: Address) -> Self {
        Self::new(owner, TokenId::NATIVE)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({:?}, {:?})", self.owner, self.token)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token.is_native() {
            write!(f, "{}/native", self.owner)
        } else {
            write!(f, "{}/{}", self.owner, &self.token.to_hex()[..12])
        }
    }
}

/// The committed state of a single account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Balance in the smallest unit. Never negative by construction.
    pub balance: u64,
    /// Number of commits that have touched this account.
    pub version: u64,
    /// Opaque contract state. Only contract accounts write it, and only
    /// with an attested `Proof`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub app_state: Vec<u8>,
}

impl Account {
    /// An account holding `balance` at version 0.
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// Returns `true` if the account holds nothing and has no state.
    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.app_state.is_empty()
    }
}
