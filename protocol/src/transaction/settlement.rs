//! # Atomic Settlement
//!
//! [`settle`] turns a [`Transaction`] into a committed state change, or
//! rejects it without touching anything. The pipeline runs from cheapest
//! to most expensive check:
//!
//! ```text
//! limits -> verifier -> structure -> preconditions -> staged apply -> supply -> commit
//! ```
//!
//! Everything before `commit` works on a scratch overlay of the accounts the
//! forest touches; the committed [`LedgerState`] is only borrowed mutably
//! for the final write-back.
//!
//! ## Rules
//!
//! - Every update of a custom token must be a direct child of an update on
//!   that token's issuer account. The issuer's authorization on that parent
//!   is what approves the movement.
//! - Version preconditions compare against committed state, never against
//!   changes staged earlier in the same transaction.
//! - Balance changes apply in pre-order; a debit that drives any account
//!   negative at any point rejects the transaction.
//! - A token's net change across the forest may be positive (minting under
//!   its issuer's approval) or zero. Negative nets would burn and are
//!   rejected, and the native supply never changes.
//! - Every account the forest changes, or on which it carries a signed or
//!   attested update, is written back with its version bumped by one. Any
//!   other zero-delta update without state is a pure read: its
//!   precondition is checked and nothing is written. That includes a
//!   public issuer approval, so movements of a token do not contend on
//!   the issuer's version.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::approval::{check_depth, net_deltas, ApprovalError};
use super::builder::{Transaction, TransactionError};
use super::update::{AccountUpdate, Authorization, Precondition};
use super::verification::{TransitionVerifier, VerifyError};
use crate::config::LedgerConfig;
use crate::error::{Rejection, RejectionKind};
use crate::ledger::{Account, AccountId, LedgerState, StateView, TokenId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a transaction was not committed.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The forest has no updates.
    #[error("transaction has no account updates")]
    Empty,

    /// The forest has more updates than the configured limit.
    #[error("transaction has {count} account updates, limit is {max}")]
    TooManyUpdates { count: usize, max: usize },

    /// The verifier refused the transaction.
    #[error("authorization rejected: {0}")]
    Rejected(#[from] VerifyError),

    /// A structural guard failed.
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// An update names a token that is neither native nor registered.
    #[error("unknown token {0}")]
    UnknownToken(TokenId),

    /// A custom-token update is not a direct child of its issuer's update.
    #[error("update of {account} is not approved by the token issuer")]
    UnapprovedTokenUpdate { account: AccountId },

    /// A delta's magnitude exceeds `u64::MAX`.
    #[error("delta {delta} on {account} is out of range")]
    InvalidDelta { account: AccountId, delta: i128 },

    /// A version precondition no longer holds.
    #[error("conflict on {account}: expected version {expected}, found {actual}")]
    Conflict {
        account: AccountId,
        expected: u64,
        actual: u64,
    },

    /// A debit exceeds the balance available at that point.
    #[error("insufficient balance on {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        account: AccountId,
        available: u64,
        requested: u64,
    },

    /// A credit would push a balance past `u64::MAX`.
    #[error("balance overflow on {0}")]
    BalanceOverflow(AccountId),

    /// The forest destroys units of a token.
    #[error("token {token} would lose {burned} units of supply")]
    SupplyUnderflow { token: TokenId, burned: u128 },

    /// The forest creates or destroys native units.
    #[error("native supply cannot change (net {net})")]
    NativeSupplyChange { net: i128 },

    /// Minting would push a token's supply past `u64::MAX`.
    #[error("supply overflow for token {0}")]
    SupplyOverflow(TokenId),

    /// The transaction could not be encoded for hashing.
    #[error(transparent)]
    Encoding(#[from] TransactionError),
}

impl Rejection for SettlementError {
    fn kind(&self) -> RejectionKind {
        match self {
            SettlementError::Rejected(e) => e.kind(),
            SettlementError::Approval(e) => e.kind(),
            SettlementError::UnapprovedTokenUpdate { .. } => RejectionKind::Unauthorized,
            SettlementError::Conflict { .. } => RejectionKind::Conflict,
            SettlementError::InsufficientBalance { .. } => RejectionKind::InsufficientBalance,
            SettlementError::InvalidDelta { .. }
            | SettlementError::BalanceOverflow(_)
            | SettlementError::SupplyOverflow(_) => RejectionKind::Overflow,
            SettlementError::Empty
            | SettlementError::TooManyUpdates { .. }
            | SettlementError::UnknownToken(_)
            | SettlementError::SupplyUnderflow { .. }
            | SettlementError::NativeSupplyChange { .. }
            | SettlementError::Encoding(_) => RejectionKind::InvalidTransaction,
        }
    }
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// Proof of commit returned to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hex-encoded transaction digest.
    pub tx_hash: String,
    /// Ledger height after this commit.
    pub height: u64,
    /// Every account written, in `AccountId` order.
    pub touched: Vec<AccountId>,
    /// Units minted per token, for tokens whose supply grew.
    pub minted: BTreeMap<TokenId, u64>,
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Validates `tx` against `state` and commits it atomically.
///
/// On `Err`, `state` is exactly as it was.
pub fn settle(
    state: &mut LedgerState,
    tx: &Transaction,
    verifier: &dyn TransitionVerifier,
    config: &LedgerConfig,
) -> Result<Receipt, SettlementError> {
    let tx_hash = tx.hash_hex()?;
    let staged = match stage(state, tx, verifier, config) {
        Ok(staged) => staged,
        Err(e) => {
            tracing::warn!(tx = %tx_hash, memo = %tx.memo, error = %e, kind = %e.kind(), "transaction rejected");
            return Err(e);
        }
    };
    tracing::debug!(tx = %tx_hash, accounts = staged.accounts.len(), "transaction staged");

    let touched: Vec<AccountId> = staged.accounts.keys().copied().collect();
    let minted = staged.minted;
    state.apply_commit(staged.accounts, staged.supplies);
    let height = state.height();

    tracing::info!(
        tx = %tx_hash,
        memo = %tx.memo,
        height,
        touched = touched.len(),
        minted = minted.len(),
        "transaction settled"
    );

    Ok(Receipt {
        tx_hash,
        height,
        touched,
        minted,
    })
}

/// Everything a successful validation produces, ready to write back.
struct Staged {
    accounts: BTreeMap<AccountId, Account>,
    supplies: BTreeMap<TokenId, u64>,
    minted: BTreeMap<TokenId, u64>,
}

fn stage(
    state: &LedgerState,
    tx: &Transaction,
    verifier: &dyn TransitionVerifier,
    config: &LedgerConfig,
) -> Result<Staged, SettlementError> {
    let forest = &tx.updates;

    // 1. Limits.
    if forest.is_empty() {
        return Err(SettlementError::Empty);
    }
    let count = forest.count();
    if count > config.max_account_updates {
        return Err(SettlementError::TooManyUpdates {
            count,
            max: config.max_account_updates,
        });
    }
    check_depth(forest, config.max_forest_depth)?;

    // 2. Authorization.
    verifier.verify(tx, state)?;

    // 3. Structure and 4. preconditions, in one pass.
    forest.try_walk(&mut |update, parent| {
        check_structure(state, update, parent)?;
        check_precondition(state, update)
    })?;

    // 5. Staged application.
    let mut accounts: BTreeMap<AccountId, Account> = BTreeMap::new();
    forest.try_walk(&mut |update, _| apply_staged(state, &mut accounts, update))?;
    for account in accounts.values_mut() {
        account.version += 1;
    }

    // 6. Supply.
    let mut per_token: BTreeMap<TokenId, i128> = BTreeMap::new();
    for (id, net) in net_deltas(forest)? {
        let entry = per_token.entry(id.token).or_insert(0);
        *entry = entry
            .checked_add(net)
            .ok_or(ApprovalError::DeltaOverflow(id))?;
    }

    let mut supplies = BTreeMap::new();
    let mut minted = BTreeMap::new();
    for (token, net) in per_token {
        if net == 0 {
            continue;
        }
        if token.is_native() {
            return Err(SettlementError::NativeSupplyChange { net });
        }
        if net < 0 {
            return Err(SettlementError::SupplyUnderflow {
                token,
                burned: net.unsigned_abs(),
            });
        }
        let current = state
            .total_supply(&token)
            .ok_or(SettlementError::UnknownToken(token))?;
        let added = u64::try_from(net).map_err(|_| SettlementError::SupplyOverflow(token))?;
        let supply = current
            .checked_add(added)
            .ok_or(SettlementError::SupplyOverflow(token))?;
        supplies.insert(token, supply);
        minted.insert(token, added);
    }

    Ok(Staged {
        accounts,
        supplies,
        minted,
    })
}

fn check_structure(
    state: &LedgerState,
    update: &AccountUpdate,
    parent: Option<&AccountUpdate>,
) -> Result<(), SettlementError> {
    let account = update.account;
    if update.delta.unsigned_abs() > u128::from(u64::MAX) {
        return Err(SettlementError::InvalidDelta {
            account,
            delta: update.delta,
        });
    }

    if account.token.is_native() {
        return Ok(());
    }
    let record = state
        .token(&account.token)
        .ok_or(SettlementError::UnknownToken(account.token))?;
    match parent {
        Some(p) if p.account == record.issuer_account() => Ok(()),
        _ => Err(SettlementError::UnapprovedTokenUpdate { account }),
    }
}

fn check_precondition(state: &LedgerState, update: &AccountUpdate) -> Result<(), SettlementError> {
    match update.precondition {
        None => Ok(()),
        Some(Precondition::Version(expected)) => {
            let actual = state.version(&update.account);
            if actual == expected {
                Ok(())
            } else {
                Err(SettlementError::Conflict {
                    account: update.account,
                    expected,
                    actual,
                })
            }
        }
    }
}

fn apply_staged(
    state: &LedgerState,
    accounts: &mut BTreeMap<AccountId, Account>,
    update: &AccountUpdate,
) -> Result<(), SettlementError> {
    let nonce = update.authorization == Authorization::Signature || update.is_attested();
    if update.delta == 0 && update.app_state.is_none() && !nonce {
        return Ok(());
    }

    let id = update.account;
    let account = accounts
        .entry(id)
        .or_insert_with(|| state.account(&id).cloned().unwrap_or_default());

    let next = i128::from(account.balance) + update.delta;
    if next < 0 {
        return Err(SettlementError::InsufficientBalance {
            account: id,
            available: account.balance,
            requested: u64::try_from(update.delta.unsigned_abs()).unwrap_or(u64::MAX),
        });
    }
    account.balance = u64::try_from(next).map_err(|_| SettlementError::BalanceOverflow(id))?;

    if let Some(app_state) = &update.app_state {
        account.app_state = app_state.clone();
    }
    Ok(())
}
