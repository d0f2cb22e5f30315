//! # Escrow Account
//!
//! The vault's custody of its bound token: the account `(vault, token)`.
//! Only the vault constructs an [`EscrowAccount`], and only the vault can
//! ask it for a debit. The debit claims the vault's contract proof; it
//! settles only inside an operation the vault has attested.
//!
//! The escrow re-checks its own balance on every debit, independently of
//! whatever the vault checked before calling it.

use lumina_protocol::crypto::Address;
use lumina_protocol::ledger::{AccountId, TokenId};
use lumina_protocol::transaction::{AccountUpdate, Authorization};
use lumina_protocol::{Rejection, RejectionKind};
use thiserror::Error;

use crate::env::{CallEnv, PinnedBalance};

/// Errors raised by the escrow itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EscrowError {
    /// The custody balance cannot cover the debit.
    #[error("Balance less than withdrawal amount (has {available}, requested {requested})")]
    InsufficientEscrowBalance { available: u64, requested: u64 },
}

impl Rejection for EscrowError {
    fn kind(&self) -> RejectionKind {
        match self {
            EscrowError::InsufficientEscrowBalance { .. } => RejectionKind::InsufficientEscrowBalance,
        }
    }
}

/// Custody of one token, held by one vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowAccount {
    account: AccountId,
}

impl EscrowAccount {
    pub(crate) fn new(vault: Address, token: TokenId) -> Self {
        Self {
            account: AccountId::new(vault, token),
        }
    }

    /// The custody account.
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// The custody balance, pinned for the enclosing operation.
    pub fn balance(&self, env: &CallEnv<'_>) -> PinnedBalance {
        env.pinned(self.account)
    }

    /// A debit of `amount`, pinned to the version just read and claiming the
    /// vault's proof. It still needs the token issuer's approval, and the
    /// vault's attestation somewhere above it.
    pub(crate) fn debit(&self, env: &CallEnv<'_>, amount: u64) -> Result<AccountUpdate, EscrowError> {
        let current = self.balance(env);
        if current.balance < amount {
            return Err(EscrowError::InsufficientEscrowBalance {
                available: current.balance,
                requested: amount,
            });
        }
        Ok(AccountUpdate::debit(self.account, amount)
            .authorized(Authorization::Proof)
            .require_version(current.version))
    }
}
