// Copyright (c) 2026 Lumina Contributors. MIT License.
// See LICENSE for details.

//! # Lumina Protocol: Ledger Primitives
//!
//! The ledger underneath the Lumina pool contracts. It knows nothing about
//! vaults or liquidity shares; it knows about accounts, token ids, and
//! forests of proposed balance changes that either commit together or not
//! at all.
//!
//! ## Architecture
//!
//! - **crypto**: Addresses, Ed25519 keypairs and signature checks, BLAKE3.
//! - **ledger**: Token ids, accounts, the committed state, and the shared
//!   ledger handle that serializes commits.
//! - **transaction**: Account-update forests, the zero-balance-change
//!   guards, transaction digests, authorization verification, settlement.
//! - **config**: Protocol constants and the runtime [`config::LedgerConfig`].
//! - **error**: The rejection taxonomy surfaced to clients.
//! - **logging**: `tracing` subscriber setup.
//!
//! ## Ground Rules
//!
//! 1. Balances are `u64` in the smallest unit. Deltas are `i128` so that a
//!    full-range debit and credit both fit.
//! 2. Mutating paths are deterministic functions of the prior committed
//!    state and the transaction. No clocks, no randomness.
//! 3. Nothing touches committed state until every precondition of a
//!    transaction has been checked against a staged copy.

pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod transaction;

pub use error::{Rejection, RejectionKind};
pub use ledger::{Account, AccountId, Ledger, LedgerState, StateView, TokenId, TokenRecord};
pub use transaction::{
    AccountUpdate, AccountUpdateForest, Authorization, Precondition, Receipt, SettlementError,
    Transaction,
};
