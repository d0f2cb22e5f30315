//! # Shared Ledger
//!
//! [`Ledger`] is the reference settlement fabric: one [`LedgerState`] behind
//! a `parking_lot::RwLock`, one verifier, one config. Any number of threads
//! may take snapshots and build transactions against them; submissions are
//! serialized by the write lock and settle one at a time.
//!
//! Contracts never hold the lock. They read a snapshot, pin the versions
//! they depend on, and let settlement reject them with `Conflict` if
//! another commit got there first.

use parking_lot::RwLock;

use super::account::{Account, AccountId};
use super::state::{LedgerState, StateError, StateView};
use super::token::{TokenId, TokenRecord};
use crate::config::LedgerConfig;
use crate::crypto::Address;
use crate::transaction::{
    settle, AuthorizationVerifier, Receipt, SettlementError, Transaction, TransitionVerifier,
};

/// A thread-safe ledger handle.
pub struct Ledger {
    state: RwLock<LedgerState>,
    verifier: Box<dyn TransitionVerifier + Send + Sync>,
    config: LedgerConfig,
}

impl Ledger {
    /// A ledger over `state` using the reference [`AuthorizationVerifier`].
    pub fn new(state: LedgerState, config: LedgerConfig) -> Self {
        Self::with_verifier(state, config, AuthorizationVerifier)
    }

    /// A ledger with a custom verifier.
    pub fn with_verifier<V>(state: LedgerState, config: LedgerConfig, verifier: V) -> Self
    where
        V: TransitionVerifier + Send + Sync + 'static,
    {
        tracing::info!(
            network = %config.network,
            height = state.height(),
            max_forest_depth = config.max_forest_depth,
            max_account_updates = config.max_account_updates,
            "ledger opened"
        );
        Self {
            state: RwLock::new(state),
            verifier: Box::new(verifier),
            config,
        }
    }

    /// The runtime configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// A consistent copy of committed state, for contracts to read and pin.
    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }

    /// Runs `f` against committed state under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        f(&self.state.read())
    }

    /// Settles a transaction. On error nothing changed.
    pub fn submit(&self, tx: &Transaction) -> Result<Receipt, SettlementError> {
        let mut state = self.state.write();
        settle(&mut state, tx, self.verifier.as_ref(), &self.config)
    }

    /// Registers a contract and its token. See
    /// [`LedgerState::deploy_contract`].
    pub fn deploy_contract(&self, address: Address, symbol: &str) -> Result<TokenId, StateError> {
        self.state.write().deploy_contract(address, symbol)
    }

    /// Committed balance of `id`.
    pub fn balance(&self, id: &AccountId) -> u64 {
        self.state.read().balance(id)
    }

    /// Recorded supply of `token`.
    pub fn supply(&self, token: &TokenId) -> Option<u64> {
        self.state.read().total_supply(token)
    }

    /// A copy of the committed account, if it was ever touched.
    pub fn account(&self, id: &AccountId) -> Option<Account> {
        self.state.read().account(id).cloned()
    }

    /// A copy of the registry entry for `token`.
    pub fn token(&self, token: &TokenId) -> Option<TokenRecord> {
        self.state.read().token(token).cloned()
    }

    /// Number of committed transactions.
    pub fn height(&self) -> u64 {
        self.state.read().height()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("network", &self.config.network)
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}
