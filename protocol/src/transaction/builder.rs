//! Transaction construction via the builder pattern.
//!
//! A [`Transaction`] is a forest of account updates plus the signatures of
//! every owner who authorized an update with `Signature`. The builder
//! assembles the forest; signing is a separate step in
//! [`super::signing`], because the forest usually comes from several
//! contract calls before anyone signs it.
//!
//! # Digest
//!
//! The digest is what signers sign and what names a transaction:
//!
//! ```text
//! digest = BLAKE3_derive_key(TRANSACTION_DIGEST_CONTEXT, bincode(sender, memo, updates))
//! ```
//!
//! Signatures are excluded, so every owner signs the same bytes and the
//! order in which they sign does not matter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::update::{AccountUpdate, AccountUpdateForest};
use crate::config::TRANSACTION_DIGEST_CONTEXT;
use crate::crypto::{domain_separated_hash, Address, Signature};
use crate::error::{Rejection, RejectionKind};

/// Errors while encoding a transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The canonical encoding could not be produced.
    #[error("failed to encode transaction: {0}")]
    Encoding(#[from] bincode::Error),
}

impl Rejection for TransactionError {
    fn kind(&self) -> RejectionKind {
        RejectionKind::InvalidTransaction
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A unit of atomic settlement.
///
/// Either every update in `updates` commits, or none does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Who submitted the transaction. Appears in logs and in the digest;
    /// it grants no authority by itself.
    pub sender: Address,

    /// Free-form note, e.g. `"deposit"`. Part of the digest.
    #[serde(default)]
    pub memo: String,

    /// The account updates to apply.
    pub updates: AccountUpdateForest,

    /// Ed25519 signatures over [`Transaction::digest`], keyed by signer.
    #[serde(default)]
    pub signatures: BTreeMap<Address, Signature>,
}

impl Transaction {
    /// An unsigned transaction.
    pub fn new(sender: Address, updates: AccountUpdateForest) -> Self {
        Self {
            sender,
            memo: String::new(),
            updates,
            signatures: BTreeMap::new(),
        }
    }

    /// The canonical bytes covered by the digest.
    pub fn signable_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        Ok(bincode::serialize(&(&self.sender, &self.memo, &self.updates))?)
    }

    /// The 32-byte digest every signer signs.
    pub fn digest(&self) -> Result<[u8; 32], TransactionError> {
        Ok(domain_separated_hash(
            TRANSACTION_DIGEST_CONTEXT,
            &self.signable_bytes()?,
        ))
    }

    /// Hex-encoded digest, the transaction's name in logs and receipts.
    pub fn hash_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.digest()?))
    }

    /// Returns `true` if `owner` has attached a signature.
    pub fn is_signed_by(&self, owner: &Address) -> bool {
        self.signatures.contains_key(owner)
    }

    /// Every owner whose update claims `Signature` authorization, each once.
    pub fn required_signers(&self) -> Vec<Address> {
        let mut signers = Vec::new();
        self.updates.walk(&mut |update, _| {
            if update.authorization == super::Authorization::Signature
                && !signers.contains(&update.account.owner)
            {
                signers.push(update.account.owner);
            }
        });
        signers
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`]s.
///
/// ```
/// use lumina_protocol::crypto::Keypair;
/// use lumina_protocol::ledger::AccountId;
/// use lumina_protocol::transaction::{AccountUpdate, Authorization, TransactionBuilder};
///
/// let alice = Keypair::generate();
/// let bob = Keypair::generate();
/// let tx = TransactionBuilder::new(alice.address())
///     .memo("pay bob")
///     .update(AccountUpdate::debit(AccountId::native(alice.address()), 5)
///         .authorized(Authorization::Signature))
///     .update(AccountUpdate::credit(AccountId::native(bob.address()), 5))
///     .build();
/// assert_eq!(tx.updates.count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    sender: Address,
    memo: String,
    updates: AccountUpdateForest,
}

impl TransactionBuilder {
    /// Starts a transaction submitted by `sender`.
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            memo: String::new(),
            updates: AccountUpdateForest::new(),
        }
    }

    /// Sets the memo.
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Appends one root update.
    pub fn update(mut self, update: AccountUpdate) -> Self {
        self.updates.push(update);
        self
    }

    /// Appends every root of a forest, typically a contract call's output.
    pub fn forest(mut self, forest: AccountUpdateForest) -> Self {
        self.updates.extend(forest);
        self
    }

    /// Finishes the unsigned transaction.
    pub fn build(self) -> Transaction {
        Transaction {
            sender: self.sender,
            memo: self.memo,
            updates: self.updates,
            signatures: BTreeMap::new(),
        }
    }
}
