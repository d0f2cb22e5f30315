//! # Transaction Module
//!
//! Construction, signing, verification, and settlement of ledger
//! transactions. Every balance movement, mint, and contract state change
//! is an [`AccountUpdate`] inside a [`Transaction`]'s forest, and every
//! forest settles atomically or not at all.
//!
//! ## Architecture
//!
//! ```text
//! update.rs       - AccountUpdate, Authorization, Precondition, AccountUpdateForest
//! approval.rs     - Zero-balance-change and balance-neutral-delegation guards
//! builder.rs      - Transaction, digest, and the fluent TransactionBuilder
//! signing.rs      - Ed25519 signing over the digest
//! verification.rs - TransitionVerifier and the reference AuthorizationVerifier
//! settlement.rs   - settle(): validate, stage, commit
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: contract calls return forests; [`TransactionBuilder`]
//!    collects them.
//! 2. **Sign**: every owner with a `Signature` update calls
//!    [`sign_transaction`].
//! 3. **Settle**: [`settle`] verifies, stages, and commits, returning a
//!    [`Receipt`].

pub mod approval;
pub mod builder;
pub mod settlement;
pub mod signing;
pub mod update;
pub mod verification;

pub use approval::{
    check_balance_neutral_delegation, check_depth, check_zero_balance_change, net_delta_for_token,
    net_deltas, ApprovalError,
};
pub use builder::{Transaction, TransactionBuilder, TransactionError};
pub use settlement::{settle, Receipt, SettlementError};
pub use signing::sign_transaction;
pub use update::{AccountUpdate, AccountUpdateForest, Authorization, Precondition};
pub use verification::{AuthorizationVerifier, TransitionVerifier, VerifyError};
