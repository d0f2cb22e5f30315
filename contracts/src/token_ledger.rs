//! # Token Ledger Contract
//!
//! One [`TokenLedger`] per custom token. It owns no storage of its own:
//! balances and supply live in the shared ledger, and every method returns
//! the account updates that would carry out the operation. Nothing happens
//! until those updates settle.
//!
//! ## Security Model
//!
//! - **Mint gating**: minting needs the token's [`MintCapability`]. There is
//!   exactly one per token, handed out by the call that registered it, and
//!   it cannot be cloned or constructed outside this crate.
//! - **Issuer approval**: every movement of the token is a child of an
//!   update on the issuer's account. [`TokenLedger::approve_compound`] is
//!   the only way this contract produces such an approval, and it refuses
//!   anything that would create or destroy units, or that would pay the
//!   issuer itself. The approval carries no attestation, so the ledger's
//!   verifier runs the same guards again before it accepts one.
//! - **Supply tracking**: settlement computes the supply change from the
//!   approved deltas, so supply equals the sum of balances after every
//!   commit. There is no burn.

use lumina_protocol::config::LIQUIDITY_SHARE_SYMBOL;
use lumina_protocol::crypto::Address;
use lumina_protocol::ledger::{AccountId, Ledger, StateError, StateView, TokenId};
use lumina_protocol::transaction::{
    check_balance_neutral_delegation, check_depth, check_zero_balance_change, AccountUpdate,
    AccountUpdateForest, ApprovalError, Authorization,
};
use lumina_protocol::{Rejection, RejectionKind};
use thiserror::Error;

use crate::env::CallEnv;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during token ledger operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The sender holds less than it tries to move.
    #[error("insufficient balance on {account}: has {available}, needs {requested}")]
    InsufficientBalance {
        account: AccountId,
        available: u64,
        requested: u64,
    },

    /// The token is not registered on the ledger.
    #[error("token not found: {0}")]
    UnknownToken(TokenId),

    /// The capability belongs to another token.
    #[error("mint capability for {actual} cannot mint {expected}")]
    CapabilityMismatch { expected: TokenId, actual: TokenId },

    /// A root of the forest to approve is not in this token.
    #[error("cannot approve {account}: not an account of token {token}")]
    ForeignUpdate { account: AccountId, token: TokenId },

    /// Minting would push supply past `u64::MAX`.
    #[error("supply overflow: minting {amount} would exceed u64::MAX")]
    SupplyOverflow { amount: u64 },

    /// An approval guard failed.
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// Registration failed.
    #[error(transparent)]
    Deploy(#[from] StateError),
}

impl Rejection for TokenError {
    fn kind(&self) -> RejectionKind {
        match self {
            TokenError::InsufficientBalance { .. } => RejectionKind::InsufficientBalance,
            TokenError::UnknownToken(_) | TokenError::ForeignUpdate { .. } => {
                RejectionKind::InvalidTransaction
            }
            TokenError::CapabilityMismatch { .. } => RejectionKind::Unauthorized,
            TokenError::SupplyOverflow { .. } => RejectionKind::Overflow,
            TokenError::Approval(e) => e.kind(),
            TokenError::Deploy(e) => e.kind(),
        }
    }
}

// ---------------------------------------------------------------------------
// MintCapability
// ---------------------------------------------------------------------------

/// The right to mint one token.
///
/// Carries the authorization the issuer account uses when it approves a
/// mint: `Signature` when a key holder controls the issuer, `Proof` when a
/// contract does (the vault's liquidity shares). A `Proof` mint only
/// settles under an update attested by that contract.
#[derive(Debug)]
pub struct MintCapability {
    token: TokenId,
    authorization: Authorization,
}

impl MintCapability {
    pub(crate) fn new(token: TokenId, authorization: Authorization) -> Self {
        Self {
            token,
            authorization,
        }
    }

    /// The token this capability mints.
    pub fn token(&self) -> TokenId {
        self.token
    }
}

// ---------------------------------------------------------------------------
// TokenLedger
// ---------------------------------------------------------------------------

/// Handle to the token issued by `issuer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLedger {
    issuer: Address,
    token: TokenId,
}

impl TokenLedger {
    /// Registers a token issued by the key holder `issuer` and returns the
    /// handle plus its only mint capability.
    ///
    /// # Errors
    ///
    /// [`TokenError::Deploy`] if `issuer` already issues a token or the
    /// symbol is invalid. The liquidity-share symbol is reserved for vaults.
    pub fn deploy(ledger: &Ledger, issuer: Address, symbol: &str) -> Result<(Self, MintCapability), TokenError> {
        if symbol == LIQUIDITY_SHARE_SYMBOL {
            return Err(StateError::InvalidSymbol(symbol.to_string()).into());
        }
        Self::deploy_with(ledger, issuer, symbol, Authorization::Signature)
    }

    pub(crate) fn deploy_with(
        ledger: &Ledger,
        issuer: Address,
        symbol: &str,
        authorization: Authorization,
    ) -> Result<(Self, MintCapability), TokenError> {
        let token = ledger.deploy_contract(issuer, symbol)?;
        tracing::info!(%issuer, symbol, %token, ?authorization, "token deployed");
        Ok((Self { issuer, token }, MintCapability::new(token, authorization)))
    }

    /// Handle to an already registered token. Carries no mint rights.
    pub fn at(issuer: Address) -> Self {
        Self {
            issuer,
            token: TokenId::derive(&issuer, &TokenId::NATIVE),
        }
    }

    /// Handle to the registered token `token`.
    pub fn for_token(view: &dyn StateView, token: TokenId) -> Result<Self, TokenError> {
        let record = view.token(&token).ok_or(TokenError::UnknownToken(token))?;
        Ok(Self {
            issuer: record.issuer,
            token,
        })
    }

    /// The token's id.
    pub fn token_id(&self) -> TokenId {
        self.token
    }

    /// The issuer's address.
    pub fn issuer(&self) -> Address {
        self.issuer
    }

    /// The account whose update must approve every movement of the token.
    pub fn issuer_account(&self) -> AccountId {
        AccountId::native(self.issuer)
    }

    /// Returns `true` if this is the liquidity-share token of a vault.
    pub fn is_liquidity_share(&self, view: &dyn StateView) -> bool {
        view.token(&self.token)
            .map(|r| r.symbol == LIQUIDITY_SHARE_SYMBOL)
            .unwrap_or(false)
    }

    /// `owner`'s committed balance.
    pub fn balance_of(&self, view: &dyn StateView, owner: &Address) -> u64 {
        view.balance(&AccountId::new(*owner, self.token))
    }

    /// Recorded total supply; `None` if the token is not registered.
    pub fn total_supply(&self, view: &dyn StateView) -> Option<u64> {
        view.token(&self.token).map(|r| r.total_supply)
    }

    /// Mints `amount` to `to`.
    ///
    /// The returned forest is the issuer's update, authorized the way the
    /// capability says and pinned to the issuer's current version, with the
    /// credit as its only child. Any amount up to `u64::MAX` is allowed.
    pub fn mint(
        &self,
        env: &CallEnv<'_>,
        capability: &MintCapability,
        to: Address,
        amount: u64,
    ) -> Result<AccountUpdateForest, TokenError> {
        if capability.token != self.token {
            return Err(TokenError::CapabilityMismatch {
                expected: self.token,
                actual: capability.token,
            });
        }
        let supply = self
            .total_supply(env.view())
            .ok_or(TokenError::UnknownToken(self.token))?;
        if supply.checked_add(amount).is_none() {
            return Err(TokenError::SupplyOverflow { amount });
        }

        let issuer = env.pinned(self.issuer_account());
        let credit = AccountUpdate::credit(AccountId::new(to, self.token), amount);
        let approval = AccountUpdate::new(issuer.account)
            .authorized(capability.authorization)
            .require_version(issuer.version)
            .with_children(vec![credit].into());

        tracing::debug!(token = %self.token, %to, amount, "mint prepared");
        Ok(vec![approval].into())
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// Checks `from`'s committed balance, pins the version it read, and
    /// returns the pair of updates under the issuer's approval.
    pub fn transfer(
        &self,
        env: &CallEnv<'_>,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<AccountUpdateForest, TokenError> {
        let source = env.pinned(AccountId::new(from, self.token));
        if source.balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: source.account,
                available: source.balance,
                requested: amount,
            });
        }

        let forest: AccountUpdateForest = vec![
            AccountUpdate::debit(source.account, amount)
                .authorized(Authorization::Signature)
                .require_version(source.version),
            AccountUpdate::credit(AccountId::new(to, self.token), amount),
        ]
        .into();
        let approval = self.approve_compound(env, forest)?;

        tracing::debug!(token = %self.token, %from, %to, amount, "transfer prepared");
        Ok(vec![approval].into())
    }

    /// Approves a forest of movements in this token.
    ///
    /// The forest's roots must all be accounts of this token, its deltas
    /// must net to zero, and the issuer must come out of it unchanged.
    /// Returns the issuer update to place in the transaction, with the
    /// forest as its children.
    pub fn approve_compound(
        &self,
        env: &CallEnv<'_>,
        forest: AccountUpdateForest,
    ) -> Result<AccountUpdate, TokenError> {
        if !env.view().is_known_token(&self.token) {
            return Err(TokenError::UnknownToken(self.token));
        }
        // One level goes to the issuer update itself.
        check_depth(&forest, env.max_forest_depth().saturating_sub(1))?;
        if let Some(foreign) = forest.roots().iter().find(|u| u.account.token != self.token) {
            return Err(TokenError::ForeignUpdate {
                account: foreign.account,
                token: self.token,
            });
        }
        check_zero_balance_change(&forest, &self.token)?;
        check_balance_neutral_delegation(&forest, &self.issuer)?;

        Ok(AccountUpdate::new(self.issuer_account())
            .authorized(Authorization::Proof)
            .with_children(forest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_protocol::config::LedgerConfig;
    use lumina_protocol::crypto::Keypair;
    use lumina_protocol::ledger::LedgerState;

    fn setup() -> (Ledger, TokenLedger, MintCapability, Keypair) {
        let ledger = Ledger::new(LedgerState::new(), LedgerConfig::default());
        let issuer = Keypair::from_seed(&[7u8; 32]);
        let (token, cap) = TokenLedger::deploy(&ledger, issuer.address(), "TV2").unwrap();
        (ledger, token, cap, issuer)
    }

    #[test]
    fn share_symbol_is_reserved() {
        let ledger = Ledger::new(LedgerState::new(), LedgerConfig::default());
        let issuer = Keypair::from_seed(&[7u8; 32]).address();
        assert!(matches!(
            TokenLedger::deploy(&ledger, issuer, LIQUIDITY_SHARE_SYMBOL),
            Err(TokenError::Deploy(StateError::InvalidSymbol(_)))
        ));
    }

    #[test]
    fn at_matches_deploy() {
        let (_ledger, token, _cap, issuer) = setup();
        assert_eq!(TokenLedger::at(issuer.address()), token);
    }

    #[test]
    fn second_deploy_fails() {
        let (ledger, _token, _cap, issuer) = setup();
        let err = TokenLedger::deploy(&ledger, issuer.address(), "TV3").unwrap_err();
        assert!(matches!(
            err,
            TokenError::Deploy(StateError::ContractAlreadyDeployed(a)) if a == issuer.address()
        ));
        assert_eq!(err.kind(), RejectionKind::InvalidTransaction);
    }

    #[test]
    fn mint_wraps_credit_under_pinned_issuer() {
        let (ledger, token, cap, issuer) = setup();
        let snapshot = ledger.snapshot();
        let env = CallEnv::new(&snapshot, issuer.address());
        let to = Keypair::from_seed(&[8u8; 32]).address();

        let forest = token.mint(&env, &cap, to, 500).unwrap();
        let root = &forest.roots()[0];
        assert_eq!(root.account, token.issuer_account());
        assert_eq!(root.authorization, Authorization::Signature);
        assert!(root.precondition.is_some());
        assert_eq!(root.children.roots()[0].delta, 500);
    }

    #[test]
    fn foreign_capability_rejected() {
        let (ledger, token, _cap, _issuer) = setup();
        let other = Keypair::from_seed(&[9u8; 32]).address();
        let (_other_token, other_cap) = TokenLedger::deploy(&ledger, other, "OTH").unwrap();
        let snapshot = ledger.snapshot();
        let env = CallEnv::new(&snapshot, other);

        let err = token.mint(&env, &other_cap, other, 1).unwrap_err();
        assert!(matches!(err, TokenError::CapabilityMismatch { .. }));
        assert_eq!(err.kind(), RejectionKind::Unauthorized);
    }

    #[test]
    fn transfer_checks_balance_first() {
        let (ledger, token, _cap, _issuer) = setup();
        let snapshot = ledger.snapshot();
        let alice = Keypair::from_seed(&[1u8; 32]).address();
        let env = CallEnv::new(&snapshot, alice);

        let err = token.transfer(&env, alice, token.issuer(), 1).unwrap_err();
        assert!(matches!(
            err,
            TokenError::InsufficientBalance {
                available: 0,
                requested: 1,
                ..
            }
        ));
        assert_eq!(err.kind(), RejectionKind::InsufficientBalance);
    }

    #[test]
    fn approve_rejects_unbalanced_and_foreign() {
        let (ledger, token, _cap, _issuer) = setup();
        let snapshot = ledger.snapshot();
        let alice = Keypair::from_seed(&[1u8; 32]).address();
        let env = CallEnv::new(&snapshot, alice);
        let t = token.token_id();

        let unbalanced: AccountUpdateForest = vec![AccountUpdate::credit(AccountId::new(alice, t), 3)].into();
        let err = token.approve_compound(&env, unbalanced).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::UnbalancedDelta);

        let foreign: AccountUpdateForest = vec![AccountUpdate::new(AccountId::native(alice))].into();
        assert!(matches!(
            token.approve_compound(&env, foreign),
            Err(TokenError::ForeignUpdate { .. })
        ));
    }

    #[test]
    fn approve_rejects_paying_the_issuer() {
        let (ledger, token, _cap, issuer) = setup();
        let snapshot = ledger.snapshot();
        let alice = Keypair::from_seed(&[1u8; 32]).address();
        let env = CallEnv::new(&snapshot, alice);
        let t = token.token_id();

        let forest: AccountUpdateForest = vec![
            AccountUpdate::debit(AccountId::new(alice, t), 3).authorized(Authorization::Signature),
            AccountUpdate::credit(AccountId::new(issuer.address(), t), 3),
        ]
        .into();
        let err = token.approve_compound(&env, forest).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::UnbalancedDelegation);
    }

    #[test]
    fn approval_respects_configured_depth() {
        let (ledger, token, _cap, _issuer) = setup();
        let snapshot = ledger.snapshot();
        let alice = Keypair::from_seed(&[1u8; 32]).address();
        let nested: AccountUpdateForest = vec![AccountUpdate::new(AccountId::new(alice, token.token_id()))
            .authorized(Authorization::Signature)
            .require_version(0)
            .with_children(vec![AccountUpdate::new(AccountId::native(alice))].into())]
        .into();

        let config = LedgerConfig {
            max_forest_depth: 2,
            ..LedgerConfig::default()
        };
        let tight = CallEnv::new(&snapshot, alice).with_config(&config);
        let err = token.approve_compound(&tight, nested.clone()).unwrap_err();
        assert!(matches!(err, TokenError::Approval(ApprovalError::ForestTooDeep { .. })));
        assert_eq!(err.kind(), RejectionKind::InvalidTransaction);

        assert!(token.approve_compound(&CallEnv::new(&snapshot, alice), nested).is_ok());
    }

    #[test]
    fn unknown_token_handle() {
        let ledger = Ledger::new(LedgerState::new(), LedgerConfig::default());
        let snapshot = ledger.snapshot();
        let nobody = Keypair::from_seed(&[4u8; 32]).address();
        let env = CallEnv::new(&snapshot, nobody);
        let token = TokenLedger::at(nobody);

        assert_eq!(token.total_supply(&snapshot), None);
        assert!(matches!(
            token.approve_compound(&env, AccountUpdateForest::new()),
            Err(TokenError::UnknownToken(_))
        ));
        assert!(TokenLedger::for_token(&snapshot, token.token_id()).is_err());
    }
}
