//! # Rejection Taxonomy
//!
//! Every failure in the ledger and the contracts is a precondition failure
//! detected before anything is committed. Each module keeps its own
//! `thiserror` enum with the context a developer needs, and each of those
//! enums maps onto one [`RejectionKind`], which is what a client branches
//! on: "retry with more funds" versus "pool not initialized" versus "fix
//! your parameters".

use std::fmt;

use serde::{Deserialize, Serialize};

/// The stable, client-facing reason an operation was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionKind {
    /// A plain account does not hold enough to cover a debit.
    InsufficientBalance,
    /// An escrow (token holder) account cannot cover a debit.
    InsufficientEscrowBalance,
    /// The pool's custody balance cannot cover a withdrawal.
    InsufficientPoolBalance,
    /// An amount that must be positive was zero.
    ZeroAmount,
    /// The pool has not been bound to a token yet.
    NotInitialized,
    /// The pool is already bound to a token.
    AlreadyInitialized,
    /// A compound approval's deltas do not net to zero for its token.
    UnbalancedDelta,
    /// A delegating party would gain or lose balance through an approval.
    UnbalancedDelegation,
    /// A pinned precondition no longer matches committed state.
    Conflict,
    /// Authorization is missing or invalid.
    Unauthorized,
    /// The transaction is structurally invalid.
    InvalidTransaction,
    /// An amount or supply would leave the `u64` range.
    Overflow,
    /// The ledger configuration is unusable.
    Configuration,
}

impl RejectionKind {
    /// The kind's name exactly as clients see it.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::InsufficientBalance => "InsufficientBalance",
            RejectionKind::InsufficientEscrowBalance => "InsufficientEscrowBalance",
            RejectionKind::InsufficientPoolBalance => "InsufficientPoolBalance",
            RejectionKind::ZeroAmount => "ZeroAmount",
            RejectionKind::NotInitialized => "NotInitialized",
            RejectionKind::AlreadyInitialized => "AlreadyInitialized",
            RejectionKind::UnbalancedDelta => "UnbalancedDelta",
            RejectionKind::UnbalancedDelegation => "UnbalancedDelegation",
            RejectionKind::Conflict => "Conflict",
            RejectionKind::Unauthorized => "Unauthorized",
            RejectionKind::InvalidTransaction => "InvalidTransaction",
            RejectionKind::Overflow => "Overflow",
            RejectionKind::Configuration => "Configuration",
        }
    }

    /// Returns `true` if resubmitting against fresher state may succeed
    /// without changing the parameters.
    pub fn is_stale_state(&self) -> bool {
        matches!(self, RejectionKind::Conflict)
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every error type that can reject an operation.
pub trait Rejection: std::error::Error {
    /// The client-facing kind of this rejection.
    fn kind(&self) -> RejectionKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_variant_name() {
        assert_eq!(
            RejectionKind::InsufficientPoolBalance.to_string(),
            "InsufficientPoolBalance"
        );
        assert_eq!(
            format!("{:?}", RejectionKind::UnbalancedDelegation),
            RejectionKind::UnbalancedDelegation.as_str()
        );
    }

    #[test]
    fn only_conflicts_are_stale() {
        assert!(RejectionKind::Conflict.is_stale_state());
        assert!(!RejectionKind::InsufficientBalance.is_stale_state());
    }

    #[test]
    fn serializes_as_name() {
        let json = serde_json::to_string(&RejectionKind::ZeroAmount).unwrap();
        assert_eq!(json, "\"ZeroAmount\"");
    }
}
