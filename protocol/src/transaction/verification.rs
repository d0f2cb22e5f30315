//! Authorization verification for account-update forests.
//!
//! Settlement asks a [`TransitionVerifier`] whether every update in a
//! transaction is properly authorized before it looks at balances. The
//! verifier is a trait so a proof-checking backend can replace the
//! reference [`AuthorizationVerifier`] without touching settlement.
//!
//! The reference rules, checked per update in pre-order:
//!
//! 1. A debit needs some authorization.
//! 2. An update with children is an approval and needs some authorization.
//! 3. Writing `app_state` needs `Proof`, attested or covered (rule 5).
//! 4. `Signature` needs a valid Ed25519 signature by the account owner over
//!    the transaction digest, and a version precondition. The pinned
//!    version plays the role of a nonce: once the transaction commits the
//!    version moves, so the same signed forest cannot settle twice.
//! 5. `Proof` is only for accounts owned by a deployed contract, and is
//!    accepted in one of three ways:
//!    - **attested**: the contract's key signed the update's attestation
//!      digest, which covers its whole subtree. Attested updates must pin a
//!      version, for the same reason signed ones do.
//!    - **covered**: an attested ancestor owned by the same contract.
//!    - **public approval**: no balance change and no state write, on the
//!      issuer account of a token, approving only that token's accounts,
//!      with children that net to zero and leave the issuer unchanged.
//!      Anyone may build one; the verifier re-runs the guards itself.
//!
//! Anything else claiming `Proof` is rejected as unauthorized.

use std::collections::BTreeMap;

use thiserror::Error;

use super::approval::{check_balance_neutral_delegation, check_zero_balance_change, ApprovalError};
use super::builder::{Transaction, TransactionError};
use super::update::{AccountUpdate, AccountUpdateForest, Authorization};
use crate::crypto::{verify, Address};
use crate::error::{Rejection, RejectionKind};
use crate::ledger::{AccountId, StateView, TokenId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why the verifier refused a transaction.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// A debit carries no authorization.
    #[error("debit of {account} is not authorized")]
    UnauthorizedDebit { account: AccountId },

    /// An update approves children without authorization.
    #[error("approval by {account} is not authorized")]
    UnauthorizedApproval { account: AccountId },

    /// Contract state written without an attested contract proof.
    #[error("state write on {account} requires an attested contract proof")]
    UnauthorizedStateWrite { account: AccountId },

    /// `Signature` claimed without pinning the account version.
    #[error("signed update on {account} has no version precondition")]
    UnpinnedSignature { account: AccountId },

    /// `Signature` claimed but the owner did not sign.
    #[error("missing signature from {owner}")]
    MissingSignature { owner: Address },

    /// The owner's signature does not verify over the digest.
    #[error("invalid signature from {owner}")]
    InvalidSignature { owner: Address },

    /// `Proof` claimed for an account no contract owns.
    #[error("proof authorization on {account}, which is not a contract account")]
    ProofWithoutContract { account: AccountId },

    /// An attestation that does not verify against the owning contract, or
    /// is attached to an update that does not claim `Proof`.
    #[error("invalid contract attestation on {account}")]
    InvalidAttestation { account: AccountId },

    /// Attested without pinning the account version.
    #[error("attested update on {account} has no version precondition")]
    UnpinnedAttestation { account: AccountId },

    /// `Proof` with neither an attestation nor the shape of a public
    /// issuer approval.
    #[error("proof on {account} is not attested by its contract")]
    UnattestedProof { account: AccountId },

    /// A public issuer approval whose children fail the approval guards.
    #[error("unattested approval by {account} rejected: {source}")]
    UnbalancedApproval {
        account: AccountId,
        #[source]
        source: ApprovalError,
    },

    /// A digest could not be computed.
    #[error(transparent)]
    Encoding(#[from] TransactionError),
}

impl Rejection for VerifyError {
    fn kind(&self) -> RejectionKind {
        match self {
            VerifyError::Encoding(_) => RejectionKind::InvalidTransaction,
            _ => RejectionKind::Unauthorized,
        }
    }
}

// ---------------------------------------------------------------------------
// TransitionVerifier
// ---------------------------------------------------------------------------

/// Decides whether a transaction's updates are authorized.
pub trait TransitionVerifier {
    /// Returns `Ok(())` if every update in `tx` is authorized against
    /// committed `state`.
    fn verify(&self, tx: &Transaction, state: &dyn StateView) -> Result<(), VerifyError>;
}

/// The reference verifier: Ed25519 signatures for user accounts, Ed25519
/// attestations or re-checked issuer approvals for contract accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationVerifier;

/// What one verification pass carries down the forest.
struct Scope<'a> {
    tx: &'a Transaction,
    digest: [u8; 32],
    state: &'a dyn StateView,
    /// Each owner's signature is checked once, however many updates it covers.
    signers: BTreeMap<Address, bool>,
    /// Contracts with an attested update on the path from the root.
    attested: Vec<Address>,
}

impl AuthorizationVerifier {
    fn check_forest(&self, forest: &AccountUpdateForest, scope: &mut Scope<'_>) -> Result<(), VerifyError> {
        for update in forest.roots() {
            let attested = self.check_update(update, scope)?;
            if attested {
                scope.attested.push(update.account.owner);
            }
            let result = self.check_forest(&update.children, scope);
            if attested {
                scope.attested.pop();
            }
            result?;
        }
        Ok(())
    }

    /// Checks one update; returns `true` if it carries a valid attestation.
    fn check_update(&self, update: &AccountUpdate, scope: &mut Scope<'_>) -> Result<bool, VerifyError> {
        let account = update.account;

        if update.is_debit() && !update.authorization.is_some() {
            return Err(VerifyError::UnauthorizedDebit { account });
        }
        if !update.children.is_empty() && !update.authorization.is_some() {
            return Err(VerifyError::UnauthorizedApproval { account });
        }
        if update.app_state.is_some() && update.authorization != Authorization::Proof {
            return Err(VerifyError::UnauthorizedStateWrite { account });
        }
        if update.is_attested() && update.authorization != Authorization::Proof {
            return Err(VerifyError::InvalidAttestation { account });
        }

        match update.authorization {
            Authorization::None => Ok(false),
            Authorization::Proof => self.check_proof(update, scope),
            Authorization::Signature => {
                if update.precondition.is_none() {
                    return Err(VerifyError::UnpinnedSignature { account });
                }
                let owner = account.owner;
                let valid = match scope.signers.get(&owner) {
                    Some(valid) => *valid,
                    None => {
                        let signature = scope
                            .tx
                            .signatures
                            .get(&owner)
                            .ok_or(VerifyError::MissingSignature { owner })?;
                        let valid = verify(&owner, &scope.digest, signature).is_ok();
                        scope.signers.insert(owner, valid);
                        valid
                    }
                };
                if valid {
                    Ok(false)
                } else {
                    Err(VerifyError::InvalidSignature { owner })
                }
            }
        }
    }

    fn check_proof(&self, update: &AccountUpdate, scope: &Scope<'_>) -> Result<bool, VerifyError> {
        let account = update.account;
        let owner = account.owner;
        if !scope.state.is_contract(&owner) {
            return Err(VerifyError::ProofWithoutContract { account });
        }

        if let Some(attestation) = &update.attestation {
            if update.precondition.is_none() {
                return Err(VerifyError::UnpinnedAttestation { account });
            }
            let digest = update.attestation_digest()?;
            verify(&owner, &digest, attestation).map_err(|_| VerifyError::InvalidAttestation { account })?;
            return Ok(true);
        }
        if scope.attested.contains(&owner) {
            return Ok(false);
        }
        check_public_approval(update, scope.state)?;
        Ok(false)
    }
}

/// An unattested `Proof` is only acceptable as an issuer approval that the
/// guards can re-check from the forest alone.
fn check_public_approval(update: &AccountUpdate, state: &dyn StateView) -> Result<(), VerifyError> {
    let account = update.account;
    if update.app_state.is_some() {
        return Err(VerifyError::UnauthorizedStateWrite { account });
    }
    if update.delta != 0 {
        return Err(VerifyError::UnattestedProof { account });
    }

    let token = TokenId::derive(&account.owner, &account.token);
    let issues_token = state
        .token(&token)
        .is_some_and(|record| record.issuer_account() == account);
    if !issues_token || update.children.roots().iter().any(|u| u.account.token != token) {
        return Err(VerifyError::UnattestedProof { account });
    }

    check_zero_balance_change(&update.children, &token)
        .and_then(|()| check_balance_neutral_delegation(&update.children, &account.owner))
        .map_err(|source| VerifyError::UnbalancedApproval { account, source })
}

impl TransitionVerifier for AuthorizationVerifier {
    fn verify(&self, tx: &Transaction, state: &dyn StateView) -> Result<(), VerifyError> {
        let mut scope = Scope {
            tx,
            digest: tx.digest()?,
            state,
            signers: BTreeMap::new(),
            attested: Vec::new(),
        };
        self.check_forest(&tx.updates, &mut scope)
    }
}
