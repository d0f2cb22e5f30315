//! # Approval Guards
//!
//! When a token issuer approves a forest of child updates it takes
//! responsibility for two things:
//!
//! - **Zero balance change**: the children move its token around but do not
//!   create or destroy any. The signed deltas in that token sum to zero.
//! - **Balance-neutral delegation**: the approving party does not quietly
//!   pay itself. Its own accounts net to zero in every token of the
//!   approved forest.
//!
//! Both are pure functions over a forest; nothing here reads state. Sums
//! are accumulated in `i128` with checked arithmetic, which is exact for
//! any forest settlement would accept.

use std::collections::BTreeMap;

use thiserror::Error;

use super::update::AccountUpdateForest;
use crate::crypto::Address;
use crate::error::{Rejection, RejectionKind};
use crate::ledger::{AccountId, TokenId};

/// A guard rejected the forest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    /// The approved updates create or destroy units of the token.
    #[error("deltas for token {token} sum to {net}, expected 0")]
    UnbalancedDelta { token: TokenId, net: i128 },

    /// The approving party's own balance would change.
    #[error("approving party {party} would change by {net} in token {token}")]
    UnbalancedDelegation {
        party: Address,
        token: TokenId,
        net: i128,
    },

    /// The forest nests deeper than allowed.
    #[error("forest depth {depth} exceeds limit {max}")]
    ForestTooDeep { depth: usize, max: usize },

    /// Summing deltas left the `i128` range.
    #[error("delta sum overflow on {0}")]
    DeltaOverflow(AccountId),
}

impl Rejection for ApprovalError {
    fn kind(&self) -> RejectionKind {
        match self {
            ApprovalError::UnbalancedDelta { .. } => RejectionKind::UnbalancedDelta,
            ApprovalError::UnbalancedDelegation { .. } => RejectionKind::UnbalancedDelegation,
            ApprovalError::ForestTooDeep { .. } => RejectionKind::InvalidTransaction,
            ApprovalError::DeltaOverflow(_) => RejectionKind::Overflow,
        }
    }
}

/// Net delta of every account mentioned anywhere in the forest.
///
/// Accounts whose updates cancel out still appear, with a net of zero.
pub fn net_deltas(forest: &AccountUpdateForest) -> Result<BTreeMap<AccountId, i128>, ApprovalError> {
    let mut nets: BTreeMap<AccountId, i128> = BTreeMap::new();
    forest.try_walk(&mut |update, _| {
        let entry = nets.entry(update.account).or_insert(0);
        *entry = entry
            .checked_add(update.delta)
            .ok_or(ApprovalError::DeltaOverflow(update.account))?;
        Ok::<(), ApprovalError>(())
    })?;
    Ok(nets)
}

/// Sum of every delta in `token`, at any depth.
pub fn net_delta_for_token(forest: &AccountUpdateForest, token: &TokenId) -> Result<i128, ApprovalError> {
    let mut net: i128 = 0;
    forest.try_walk(&mut |update, _| {
        if update.account.token == *token {
            net = net
                .checked_add(update.delta)
                .ok_or(ApprovalError::DeltaOverflow(update.account))?;
        }
        Ok::<(), ApprovalError>(())
    })?;
    Ok(net)
}

/// Fails unless the forest's deltas in `token` sum to exactly zero.
pub fn check_zero_balance_change(forest: &AccountUpdateForest, token: &TokenId) -> Result<(), ApprovalError> {
    let net = net_delta_for_token(forest, token)?;
    if net != 0 {
        tracing::debug!(%token, net, "zero balance change violated");
        return Err(ApprovalError::UnbalancedDelta { token: *token, net });
    }
    Ok(())
}

/// Fails if any account owned by `party` nets to a non-zero change.
///
/// Netting is per token: a party may neither gain nor lose in any token
/// kind, regardless of what happens in the others.
pub fn check_balance_neutral_delegation(forest: &AccountUpdateForest, party: &Address) -> Result<(), ApprovalError> {
    let nets = net_deltas(forest)?;
    let mut per_token: BTreeMap<TokenId, i128> = BTreeMap::new();
    for (account, net) in nets.into_iter().filter(|(id, _)| id.owner == *party) {
        let entry = per_token.entry(account.token).or_insert(0);
        *entry = entry
            .checked_add(net)
            .ok_or(ApprovalError::DeltaOverflow(account))?;
    }

    if let Some((token, net)) = per_token.into_iter().find(|(_, net)| *net != 0) {
        tracing::debug!(%party, %token, net, "delegation is not balance neutral");
        return Err(ApprovalError::UnbalancedDelegation {
            party: *party,
            token,
            net,
        });
    }
    Ok(())
}

/// Fails if the forest nests deeper than `max`.
pub fn check_depth(forest: &AccountUpdateForest, max: usize) -> Result<(), ApprovalError> {
    let depth = forest.depth();
    if depth > max {
        return Err(ApprovalError::ForestTooDeep { depth, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::transaction::update::AccountUpdate;

    fn addr(seed: u8) -> Address {
        Keypair::from_seed(&[seed; 32]).address()
    }

    fn token() -> TokenId {
        TokenId::derive(&addr(9), &TokenId::NATIVE)
    }

    fn in_token(seed: u8) -> AccountId {
        AccountId::new(addr(seed), token())
    }

    #[test]
    fn transfer_pair_is_balanced() {
        let forest: AccountUpdateForest = vec![
            AccountUpdate::debit(in_token(1), 10),
            AccountUpdate::credit(in_token(2), 10),
        ]
        .into();
        assert!(check_zero_balance_change(&forest, &token()).is_ok());
    }

    #[test]
    fn uncovered_credit_is_unbalanced() {
        let forest: AccountUpdateForest = vec![
            AccountUpdate::debit(in_token(1), 10),
            AccountUpdate::credit(in_token(2), 11),
        ]
        .into();
        let err = check_zero_balance_change(&forest, &token()).unwrap_err();
        assert_eq!(err, ApprovalError::UnbalancedDelta { token: token(), net: 1 });
        assert_eq!(err.kind(), RejectionKind::UnbalancedDelta);
    }

    #[test]
    fn other_tokens_do_not_count() {
        let forest: AccountUpdateForest = vec![
            AccountUpdate::debit(in_token(1), 10),
            AccountUpdate::credit(in_token(2), 10),
            AccountUpdate::credit(AccountId::native(addr(3)), 99),
        ]
        .into();
        assert!(check_zero_balance_change(&forest, &token()).is_ok());
        assert_eq!(net_delta_for_token(&forest, &TokenId::NATIVE).unwrap(), 99);
    }

    #[test]
    fn nested_deltas_are_summed() {
        let forest: AccountUpdateForest = vec![AccountUpdate::new(in_token(1)).with_children(
            vec![
                AccountUpdate::debit(in_token(2), 4),
                AccountUpdate::credit(in_token(1), 3),
            ]
            .into(),
        )]
        .into();
        let nets = net_deltas(&forest).unwrap();
        assert_eq!(nets[&in_token(1)], 3);
        assert_eq!(nets[&in_token(2)], -4);
        assert_eq!(net_delta_for_token(&forest, &token()).unwrap(), -1);
    }

    #[test]
    fn party_receiving_is_not_neutral() {
        let forest: AccountUpdateForest = vec![
            AccountUpdate::debit(in_token(1), 5),
            AccountUpdate::credit(in_token(9), 5),
        ]
        .into();
        assert!(check_balance_neutral_delegation(&forest, &addr(1)).is_err());
        let err = check_balance_neutral_delegation(&forest, &addr(9)).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::UnbalancedDelegation);
        assert!(check_balance_neutral_delegation(&forest, &addr(4)).is_ok());
    }

    #[test]
    fn party_passing_through_is_neutral() {
        let forest: AccountUpdateForest = vec![
            AccountUpdate::debit(in_token(1), 5),
            AccountUpdate::credit(in_token(9), 5),
            AccountUpdate::debit(in_token(9), 5),
            AccountUpdate::credit(in_token(2), 5),
        ]
        .into();
        assert!(check_balance_neutral_delegation(&forest, &addr(9)).is_ok());
    }

    #[test]
    fn depth_limit() {
        let deep: AccountUpdateForest = vec![AccountUpdate::new(in_token(1)).with_children(
            vec![AccountUpdate::new(in_token(2))
                .with_children(vec![AccountUpdate::new(in_token(3))].into())]
            .into(),
        )]
        .into();
        assert!(check_depth(&deep, 3).is_ok());
        assert_eq!(
            check_depth(&deep, 2),
            Err(ApprovalError::ForestTooDeep { depth: 3, max: 2 })
        );
    }

    #[test]
    fn overflow_is_reported() {
        let mut a = AccountUpdate::new(in_token(1));
        a.delta = i128::MAX;
        let mut b = AccountUpdate::new(in_token(1));
        b.delta = 1;
        let forest: AccountUpdateForest = vec![a, b].into();
        assert_eq!(
            net_deltas(&forest),
            Err(ApprovalError::DeltaOverflow(in_token(1)))
        );
    }
}
