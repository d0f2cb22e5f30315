//! # Call Environment
//!
//! Contract methods never touch the ledger directly. They get a
//! [`CallEnv`]: a read-only view of committed state and the identity of
//! the caller. Every read that a method's output depends on is returned as
//! a [`PinnedBalance`], so the method can attach the version it saw as a
//! precondition; if the account moves before the transaction settles, the
//! whole operation is rejected with `Conflict`.
//!
//! The environment also carries the ledger limits a method must respect
//! when it shapes a forest, so a call built for a ledger with a tighter
//! `max_forest_depth` fails in the contract rather than at settlement.

use lumina_protocol::config::{LedgerConfig, DEFAULT_MAX_FOREST_DEPTH};
use lumina_protocol::crypto::Address;
use lumina_protocol::ledger::{AccountId, StateView};

/// A balance together with the account version it was read at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinnedBalance {
    /// The account read.
    pub account: AccountId,
    /// Its committed balance.
    pub balance: u64,
    /// Its committed version; attach as a precondition.
    pub version: u64,
}

/// The context one contract call runs in.
#[derive(Clone, Copy)]
pub struct CallEnv<'a> {
    view: &'a dyn StateView,
    sender: Address,
    max_forest_depth: usize,
}

impl<'a> CallEnv<'a> {
    /// A call by `sender` against `view`, usually a ledger snapshot, under
    /// the default limits.
    pub fn new(view: &'a dyn StateView, sender: Address) -> Self {
        Self {
            view,
            sender,
            max_forest_depth: DEFAULT_MAX_FOREST_DEPTH,
        }
    }

    /// Adopts the limits of the ledger the call will be submitted to.
    pub fn with_config(mut self, config: &LedgerConfig) -> Self {
        self.max_forest_depth = config.max_forest_depth;
        self
    }

    /// Deepest forest the target ledger settles.
    pub fn max_forest_depth(&self) -> usize {
        self.max_forest_depth
    }

    /// Who is calling.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// The committed state this call reads.
    pub fn view(&self) -> &'a dyn StateView {
        self.view
    }

    /// Reads `account` and remembers the version it was read at.
    pub fn pinned(&self, account: AccountId) -> PinnedBalance {
        PinnedBalance {
            account,
            balance: self.view.balance(&account),
            version: self.view.version(&account),
        }
    }
}

impl std::fmt::Debug for CallEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallEnv")
            .field("sender", &self.sender)
            .field("height", &self.view.height())
            .field("max_forest_depth", &self.max_forest_depth)
            .finish()
    }
}
