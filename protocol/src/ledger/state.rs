//! # Committed Ledger State
//!
//! [`LedgerState`] is the single source of truth: every account, every
//! token's recorded supply, and the set of deployed contract addresses.
//! Only settlement mutates it, and only after a whole transaction has been
//! staged successfully.
//!
//! Readers go through the [`StateView`] trait, which is also the seam the
//! contracts use for pinned reads.
//!
//! ## Supply Conservation
//!
//! For every token kind, the sum of all account balances equals the
//! recorded supply. [`LedgerState::check_supply_conservation`] recomputes
//! both sides; the property tests call it after every commit.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::account::{Account, AccountId};
use super::token::{TokenId, TokenRecord};
use crate::config::{is_valid_symbol, NATIVE_SYMBOL};
use crate::crypto::Address;
use crate::error::{Rejection, RejectionKind};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by state bootstrap and consistency checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The token is neither native nor registered.
    #[error("unknown token: {0}")]
    UnknownToken(TokenId),

    /// A contract is already deployed at this address.
    #[error("contract already deployed at {0}")]
    ContractAlreadyDeployed(Address),

    /// The symbol is empty, too long, or contains unsupported characters.
    #[error("invalid token symbol: {0:?}")]
    InvalidSymbol(String),

    /// Genesis allocations exceed `u64::MAX` in total.
    #[error("genesis supply overflow")]
    SupplyOverflow,

    /// Recorded supply and the sum of balances disagree.
    #[error("supply mismatch for token {token}: recorded {recorded}, balances sum to {actual}")]
    SupplyMismatch {
        /// The token whose books do not balance.
        token: TokenId,
        /// The supply on record.
        recorded: u64,
        /// The sum of balances actually held.
        actual: u128,
    },
}

impl Rejection for StateError {
    fn kind(&self) -> RejectionKind {
        match self {
            StateError::UnknownToken(_) | StateError::InvalidSymbol(_) => {
                RejectionKind::InvalidTransaction
            }
            // Registration, not the vault's bound-once state.
            StateError::ContractAlreadyDeployed(_) => RejectionKind::InvalidTransaction,
            StateError::SupplyOverflow => RejectionKind::Overflow,
            StateError::SupplyMismatch { .. } => RejectionKind::InvalidTransaction,
        }
    }
}

// ---------------------------------------------------------------------------
// StateView
// ---------------------------------------------------------------------------

/// Read access to committed state: the account-lookup boundary.
pub trait StateView {
    /// The committed account, or `None` if it has never been touched.
    fn account(&self, id: &AccountId) -> Option<&Account>;

    /// The registry entry of a custom token. `None` for native and unknown.
    fn token(&self, token: &TokenId) -> Option<&TokenRecord>;

    /// Whether `address` has a deployed contract.
    fn is_contract(&self, address: &Address) -> bool;

    /// Recorded total supply of a token, native included.
    fn total_supply(&self, token: &TokenId) -> Option<u64>;

    /// Number of committed transactions.
    fn height(&self) -> u64;

    /// Committed balance, zero for untouched accounts.
    fn balance(&self, id: &AccountId) -> u64 {
        self.account(id).map(|a| a.balance).unwrap_or(0)
    }

    /// Committed version, zero for untouched accounts.
    fn version(&self, id: &AccountId) -> u64 {
        self.account(id).map(|a| a.version).unwrap_or(0)
    }

    /// Native or registered.
    fn is_known_token(&self, token: &TokenId) -> bool {
        token.is_native() || self.token(token).is_some()
    }
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// The committed ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(with = "account_entries")]
    accounts: HashMap<AccountId, Account>,
    tokens: BTreeMap<TokenId, TokenRecord>,
    native_supply: u64,
    contracts: BTreeSet<Address>,
    height: u64,
}

impl LedgerState {
    /// An empty ledger with no native supply.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger whose native supply is exactly the given allocations.
    pub fn genesis<I>(allocations: I) -> Result<Self, StateError>
    where
        I: IntoIterator<Item = (Address, u64)>,
    {
        let mut state = Self::new();
        for (owner, amount) in allocations {
            state.native_supply = state
                .native_supply
                .checked_add(amount)
                .ok_or(StateError::SupplyOverflow)?;
            let account = state.accounts.entry(AccountId::native(owner)).or_default();
            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(StateError::SupplyOverflow)?;
        }
        tracing::info!(
            native_supply = state.native_supply,
            accounts = state.accounts.len(),
            "genesis state created"
        );
        Ok(state)
    }

    /// Registers a contract at `address` together with the token it
    /// issues from its native account.
    ///
    /// This is bootstrap configuration, not a transaction: whoever assembles
    /// the ledger decides which contracts exist. Returns the derived token
    /// id.
    pub fn deploy_contract(&mut self, address: Address, symbol: &str) -> Result<TokenId, StateError> {
        if !is_valid_symbol(symbol) || symbol == NATIVE_SYMBOL {
            return Err(StateError::InvalidSymbol(symbol.to_string()));
        }
        if self.contracts.contains(&address) {
            return Err(StateError::ContractAlreadyDeployed(address));
        }

        let token_id = TokenId::derive(&address, &TokenId::NATIVE);
        self.contracts.insert(address);
        self.tokens.insert(
            token_id,
            TokenRecord {
                token_id,
                issuer: address,
                parent: TokenId::NATIVE,
                symbol: symbol.to_string(),
                total_supply: 0,
            },
        );

        tracing::info!(%address, symbol, token = %token_id, "contract deployed");
        Ok(token_id)
    }

    /// Iterates over every committed account.
    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, &Account)> {
        self.accounts.iter()
    }

    /// Iterates over every registered custom token.
    pub fn tokens(&self) -> impl Iterator<Item = &TokenRecord> {
        self.tokens.values()
    }

    /// Recomputes every token's balance sum and compares it with the
    /// recorded supply.
    pub fn check_supply_conservation(&self) -> Result<(), StateError> {
        let mut sums: BTreeMap<TokenId, u128> = BTreeMap::new();
        for (id, account) in &self.accounts {
            *sums.entry(id.token).or_default() += u128::from(account.balance);
        }

        let recorded = std::iter::once((TokenId::NATIVE, self.native_supply)).chain(
            self.tokens
                .values()
                .map(|record| (record.token_id, record.total_supply)),
        );

        for (token, supply) in recorded {
            let actual = sums.remove(&token).unwrap_or(0);
            if actual != u128::from(supply) {
                return Err(StateError::SupplyMismatch {
                    token,
                    recorded: supply,
                    actual,
                });
            }
        }

        // Balances in a token nobody registered.
        if let Some((token, actual)) = sums.into_iter().find(|(_, sum)| *sum > 0) {
            return Err(StateError::SupplyMismatch {
                token,
                recorded: 0,
                actual,
            });
        }
        Ok(())
    }

    /// Writes a fully staged transaction back. Called by settlement only,
    /// after every check has passed.
    pub(crate) fn apply_commit(
        &mut self,
        accounts: BTreeMap<AccountId, Account>,
        supplies: BTreeMap<TokenId, u64>,
    ) {
        for (id, account) in accounts {
            self.accounts.insert(id, account);
        }
        for (token, supply) in supplies {
            if token.is_native() {
                self.native_supply = supply;
            } else if let Some(record) = self.tokens.get_mut(&token) {
                record.total_supply = supply;
            }
        }
        self.height += 1;
    }
}

impl StateView for LedgerState {
    fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    fn token(&self, token: &TokenId) -> Option<&TokenRecord> {
        self.tokens.get(token)
    }

    fn is_contract(&self, address: &Address) -> bool {
        self.contracts.contains(address)
    }

    fn total_supply(&self, token: &TokenId) -> Option<u64> {
        if token.is_native() {
            Some(self.native_supply)
        } else {
            self.tokens.get(token).map(|r| r.total_supply)
        }
    }

    fn height(&self) -> u64 {
        self.height
    }
}

// ---------------------------------------------------------------------------
// Serde helper: HashMap<AccountId, Account> as a sorted entry list
// ---------------------------------------------------------------------------

/// JSON object keys must be strings and `AccountId` is a struct, so the
/// account map is written as a list of `[id, account]` pairs, sorted so the
/// encoding is deterministic.
mod account_entries {
    use super::{Account, AccountId};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S>(map: &HashMap<AccountId, Account>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut entries: Vec<(&AccountId, &Account)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<AccountId, Account>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(AccountId, Account)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
