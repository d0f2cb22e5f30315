//! # Account Updates and Forests
//!
//! A transaction is a forest of [`AccountUpdate`]s. Each update proposes a
//! signed balance change for one account, optionally pins the version its
//! author read, optionally replaces contract state, and says how it is
//! authorized. Children hang under the update that approves them: every
//! update in a custom token must sit directly under an update of that
//! token's issuer account.
//!
//! ```text
//! [vault/native      +10 native, new pool state      Proof, attested]
//!    ├─ [alice/native   -10 native                   Signature]
//!    ├─ [tokenA/native    0                          Proof]   <- issuer approves
//!    │     ├─ [alice/T  -10                          Signature]
//!    │     └─ [vault/T  +10]
//!    └─ [vault/native     0                          Proof]   <- share mint
//!          └─ [alice/LP +20]
//! ```
//!
//! Nothing here checks anything; see [`super::approval`] for the guards and
//! [`super::settlement`] for what makes a forest committable.

use serde::{Deserialize, Serialize};

use super::builder::TransactionError;
use crate::config::UPDATE_ATTESTATION_CONTEXT;
use crate::crypto::{domain_separated_hash, Keypair, Signature};
use crate::ledger::{AccountId, TokenId};

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// How an account update claims to be authorized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authorization {
    /// No authorization. Enough for credits; never enough for a debit or a
    /// state write.
    #[default]
    None,
    /// The account owner signed the transaction digest.
    Signature,
    /// The owning contract's method produced this update. Either the
    /// contract attests it (see [`AccountUpdate::attest`]), an attested
    /// ancestor by the same contract covers it, or it is an issuer approval
    /// the verifier can re-check on its own.
    Proof,
}

impl Authorization {
    /// Returns `true` for anything but [`Authorization::None`].
    pub fn is_some(&self) -> bool {
        !matches!(self, Authorization::None)
    }
}

// ---------------------------------------------------------------------------
// Precondition
// ---------------------------------------------------------------------------

/// A requirement on committed state, checked before anything is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precondition {
    /// The account's committed version must equal this value.
    Version(u64),
}

// ---------------------------------------------------------------------------
// AccountUpdate
// ---------------------------------------------------------------------------

/// A proposed change to one account, with the updates it approves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// The account being changed.
    pub account: AccountId,
    /// Signed balance change. Settlement rejects magnitudes above `u64::MAX`.
    pub delta: i128,
    /// Optional pinned read.
    pub precondition: Option<Precondition>,
    /// Replacement contract state, if any.
    pub app_state: Option<Vec<u8>>,
    /// How this update is authorized.
    pub authorization: Authorization,
    /// Updates approved by this one.
    pub children: AccountUpdateForest,
    /// The owning contract's signature over [`AccountUpdate::attestation_digest`].
    #[serde(default)]
    pub attestation: Option<Signature>,
}

impl AccountUpdate {
    /// A no-op update on `account`.
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            delta: 0,
            precondition: None,
            app_state: None,
            authorization: Authorization::None,
            children: AccountUpdateForest::new(),
            attestation: None,
        }
    }

    /// Adds `amount` to the balance.
    pub fn credit(account: AccountId, amount: u64) -> Self {
        Self {
            delta: i128::from(amount),
            ..Self::new(account)
        }
    }

    /// Subtracts `amount` from the balance.
    pub fn debit(account: AccountId, amount: u64) -> Self {
        Self {
            delta: -i128::from(amount),
            ..Self::new(account)
        }
    }

    /// Sets the authorization.
    pub fn authorized(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    /// Pins the committed version this update was computed against.
    pub fn require_version(mut self, version: u64) -> Self {
        self.precondition = Some(Precondition::Version(version));
        self
    }

    /// Replaces the account's contract state on commit.
    pub fn set_app_state(mut self, state: Vec<u8>) -> Self {
        self.app_state = Some(state);
        self
    }

    /// Attaches children.
    pub fn with_children(mut self, children: AccountUpdateForest) -> Self {
        self.children = children;
        self
    }

    /// The bytes a contract signs to attest this update: every field but
    /// the attestation itself, children included.
    pub fn attestation_digest(&self) -> Result<[u8; 32], TransactionError> {
        let bytes = bincode::serialize(&(
            &self.account,
            &self.delta,
            &self.precondition,
            &self.app_state,
            &self.authorization,
            &self.children,
        ))?;
        Ok(domain_separated_hash(UPDATE_ATTESTATION_CONTEXT, &bytes))
    }

    /// Claims `Proof` and signs the update with the owning contract's key.
    ///
    /// Call last: changing the update or its children afterwards
    /// invalidates the attestation.
    pub fn attest(mut self, contract: &Keypair) -> Result<Self, TransactionError> {
        self.authorization = Authorization::Proof;
        let digest = self.attestation_digest()?;
        self.attestation = Some(contract.sign(&digest));
        Ok(self)
    }

    /// Returns `true` if a contract signature is attached. Whether it
    /// verifies is the verifier's business.
    pub fn is_attested(&self) -> bool {
        self.attestation.is_some()
    }

    /// The token this update moves.
    pub fn token(&self) -> TokenId {
        self.account.token
    }

    /// Returns `true` if this update removes balance.
    pub fn is_debit(&self) -> bool {
        self.delta < 0
    }
}

// ---------------------------------------------------------------------------
// AccountUpdateForest
// ---------------------------------------------------------------------------

/// An ordered list of update trees.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountUpdateForest(Vec<AccountUpdate>);

impl AccountUpdateForest {
    /// An empty forest.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a tree.
    pub fn push(&mut self, update: AccountUpdate) {
        self.0.push(update);
    }

    /// Appends every tree of another forest.
    pub fn extend(&mut self, other: AccountUpdateForest) {
        self.0.extend(other.0);
    }

    /// The root updates.
    pub fn roots(&self) -> &[AccountUpdate] {
        &self.0
    }

    /// Returns `true` if there are no trees.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of updates, at every depth.
    pub fn count(&self) -> usize {
        self.0.iter().map(|u| 1 + u.children.count()).sum()
    }

    /// Depth of the deepest update; roots are depth 1, empty forest is 0.
    pub fn depth(&self) -> usize {
        self.0
            .iter()
            .map(|u| 1 + u.children.depth())
            .max()
            .unwrap_or(0)
    }

    /// Visits every update in pre-order with its direct parent.
    ///
    /// Pre-order is also the order settlement applies balance changes in:
    /// a parent before its children, earlier siblings before later ones.
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a AccountUpdate, Option<&'a AccountUpdate>),
    {
        fn go<'a, F>(forest: &'a AccountUpdateForest, parent: Option<&'a AccountUpdate>, visit: &mut F)
        where
            F: FnMut(&'a AccountUpdate, Option<&'a AccountUpdate>),
        {
            for update in &forest.0 {
                visit(update, parent);
                go(&update.children, Some(update), visit);
            }
        }
        go(self, None, visit);
    }

    /// Fallible pre-order visit; stops at the first error.
    pub fn try_walk<'a, E, F>(&'a self, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&'a AccountUpdate, Option<&'a AccountUpdate>) -> Result<(), E>,
    {
        fn go<'a, E, F>(
            forest: &'a AccountUpdateForest,
            parent: Option<&'a AccountUpdate>,
            visit: &mut F,
        ) -> Result<(), E>
        where
            F: FnMut(&'a AccountUpdate, Option<&'a AccountUpdate>) -> Result<(), E>,
        {
            for update in &forest.0 {
                visit(update, parent)?;
                go(&update.children, Some(update), visit)?;
            }
            Ok(())
        }
        go(self, None, visit)
    }
}

impl From<Vec<AccountUpdate>> for AccountUpdateForest {
    fn from(updates: Vec<AccountUpdate>) -> Self {
        Self(updates)
    }
}

impl FromIterator<AccountUpdate> for AccountUpdateForest {
    fn from_iter<I: IntoIterator<Item = AccountUpdate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AccountUpdateForest {
    type Item = AccountUpdate;
    type IntoIter = std::vec::IntoIter<AccountUpdate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn acct(seed: u8) -> AccountId {
        AccountId::native(Keypair::from_seed(&[seed; 32]).address())
    }

    fn sample() -> AccountUpdateForest {
        let inner = AccountUpdate::new(acct(1)).with_children(
            vec![AccountUpdate::debit(acct(2), 5), AccountUpdate::credit(acct(3), 5)].into(),
        );
        vec![AccountUpdate::credit(acct(4), 1), inner].into()
    }

    #[test]
    fn count_and_depth() {
        let forest = sample();
        assert_eq!(forest.count(), 4);
        assert_eq!(forest.depth(), 2);
        assert_eq!(AccountUpdateForest::new().depth(), 0);
    }

    #[test]
    fn walk_is_preorder_with_parents() {
        let forest = sample();
        let mut seen = Vec::new();
        forest.walk(&mut |update, parent| {
            seen.push((update.account, parent.map(|p| p.account)));
        });
        assert_eq!(
            seen,
            vec![
                (acct(4), None),
                (acct(1), None),
                (acct(2), Some(acct(1))),
                (acct(3), Some(acct(1))),
            ]
        );
    }

    #[test]
    fn try_walk_stops_early() {
        let forest = sample();
        let mut visited = 0;
        let result: Result<(), ()> = forest.try_walk(&mut |update, _| {
            visited += 1;
            if update.is_debit() {
                Err(())
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(visited, 3);
    }

    #[test]
    fn builders_set_fields() {
        let update = AccountUpdate::debit(acct(1), 7)
            .authorized(Authorization::Signature)
            .require_version(3)
            .set_app_state(vec![1, 2]);
        assert_eq!(update.delta, -7);
        assert!(update.is_debit());
        assert_eq!(update.precondition, Some(Precondition::Version(3)));
        assert_eq!(update.app_state.as_deref(), Some(&[1u8, 2][..]));
        assert!(update.authorization.is_some());
    }

    #[test]
    fn attestation_covers_children() {
        let contract = Keypair::from_seed(&[9u8; 32]);
        let update = AccountUpdate::new(acct(1))
            .require_version(0)
            .with_children(vec![AccountUpdate::credit(acct(2), 5)].into())
            .attest(&contract)
            .unwrap();
        assert_eq!(update.authorization, Authorization::Proof);
        assert!(update.is_attested());

        let mut tampered = update.clone();
        tampered.children = vec![AccountUpdate::credit(acct(3), 5)].into();
        assert_ne!(
            tampered.attestation_digest().unwrap(),
            update.attestation_digest().unwrap()
        );
    }
}
