//! # Liquidity Vault Contract
//!
//! A vault custodies one bound token plus the native asset and issues
//! liquidity shares against deposits. It coordinates three parties in one
//! atomic transaction: the bound token's [`TokenLedger`], its own
//! [`EscrowAccount`] of that token, and its own share token.
//!
//! ## Lifecycle
//!
//! ```text
//! deploy ──► Uninitialized ──initialize(token)──► Initialized
//!                                                   │   ▲
//!                                         deposit / withdraw
//! ```
//!
//! ## State
//!
//! [`VaultState`] is stored as `bincode` in the `app_state` of the vault's
//! native account. Every operation reads it pinned to that account's
//! version. Two operations built from the same snapshot cannot both
//! settle: the second one meets a moved version and is rejected with
//! `Conflict`.
//!
//! ## Attestation
//!
//! A vault holds its contract key. Each operation returns a single tree
//! rooted at the vault's native account and attested with that key, so
//! the escrow debit and the share mint inside it are covered by the
//! attestation and cannot settle apart from the rest of the operation.
//!
//! ```text
//! [vault/native  +n, new state, pinned   Proof, attested]
//!    ├─ [caller/native  -n               Signature]
//!    ├─ [token issuer    0               Proof]      caller -a, custody +a
//!    └─ [vault/native    0               Proof]      caller +(a + n) shares
//! ```
//!
//! ## Issuance
//!
//! Shares are additive: depositing `a` tokens and `n` native mints `a + n`
//! shares, whatever the pool already holds. Withdrawal pays out the
//! requested amount of the bound token from custody and leaves shares and
//! `liquidity_supply` unchanged.

use lumina_protocol::config::LIQUIDITY_SHARE_SYMBOL;
use lumina_protocol::crypto::{Address, Keypair};
use lumina_protocol::ledger::{AccountId, Ledger, StateError, StateView, TokenId};
use lumina_protocol::transaction::{AccountUpdate, AccountUpdateForest, Authorization, TransactionError};
use lumina_protocol::{Rejection, RejectionKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env::CallEnv;
use crate::escrow::{EscrowAccount, EscrowError};
use crate::token_ledger::{MintCapability, TokenError, TokenLedger};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A deposit amount was zero.
    #[error("deposit amounts must be positive")]
    ZeroAmount,

    /// The vault has no bound token yet.
    #[error("vault is not initialized")]
    NotInitialized,

    /// The vault is already bound.
    #[error("vault is already initialized with token {bound}")]
    AlreadyInitialized { bound: TokenId },

    /// The token cannot be bound: native, unregistered, or a share token.
    #[error("token {0} cannot be bound to a vault")]
    InvalidToken(TokenId),

    /// Custody holds less than the withdrawal.
    #[error("Balance less than withdrawal amount (pool holds {available}, requested {requested})")]
    InsufficientPoolBalance { available: u64, requested: u64 },

    /// Share issuance would leave the `u64` range.
    #[error("liquidity share overflow")]
    Overflow,

    /// The stored vault state does not decode.
    #[error("vault state is corrupt: {0}")]
    CorruptState(#[from] bincode::Error),

    /// The token ledger refused its part.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The escrow refused its part.
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// Registration failed.
    #[error(transparent)]
    Deploy(#[from] StateError),

    /// The attestation could not be computed.
    #[error(transparent)]
    Encoding(#[from] TransactionError),
}

impl Rejection for VaultError {
    fn kind(&self) -> RejectionKind {
        match self {
            VaultError::ZeroAmount => RejectionKind::ZeroAmount,
            VaultError::NotInitialized => RejectionKind::NotInitialized,
            VaultError::AlreadyInitialized { .. } => RejectionKind::AlreadyInitialized,
            VaultError::InvalidToken(_) | VaultError::CorruptState(_) => {
                RejectionKind::InvalidTransaction
            }
            VaultError::InsufficientPoolBalance { .. } => RejectionKind::InsufficientPoolBalance,
            VaultError::Overflow => RejectionKind::Overflow,
            VaultError::Token(e) => e.kind(),
            VaultError::Escrow(e) => e.kind(),
            VaultError::Deploy(e) => e.kind(),
            VaultError::Encoding(e) => e.kind(),
        }
    }
}

// ---------------------------------------------------------------------------
// VaultState
// ---------------------------------------------------------------------------

/// What the vault remembers between calls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    /// The custodied token; set exactly once.
    pub bound_token: Option<TokenId>,
    /// Shares issued so far. Never decreases.
    pub liquidity_supply: u64,
}

impl VaultState {
    /// Returns `true` once a token is bound.
    pub fn is_initialized(&self) -> bool {
        self.bound_token.is_some()
    }

    fn decode(bytes: &[u8]) -> Result<Self, VaultError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Ok(bincode::deserialize(bytes)?)
    }

    fn encode(&self) -> Result<Vec<u8>, VaultError> {
        Ok(bincode::serialize(self)?)
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// A deployed vault: its contract key and the mint capability for its
/// shares.
#[derive(Debug)]
pub struct Vault {
    address: Address,
    key: Keypair,
    shares: TokenLedger,
    mint: MintCapability,
}

impl Vault {
    /// Registers a vault contract at `key`'s address together with its
    /// share token. The key attests every operation the vault builds.
    pub fn deploy(ledger: &Ledger, key: Keypair) -> Result<Self, VaultError> {
        let address = key.address();
        let (shares, mint) =
            TokenLedger::deploy_with(ledger, address, LIQUIDITY_SHARE_SYMBOL, Authorization::Proof)?;
        tracing::info!(vault = %address, share_token = %shares.token_id(), "vault deployed");
        Ok(Self {
            address,
            key,
            shares,
            mint,
        })
    }

    /// The vault contract's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The liquidity-share token this vault mints.
    pub fn share_token(&self) -> TokenId {
        self.shares.token_id()
    }

    /// The account holding the vault's native balance and its state.
    pub fn state_account(&self) -> AccountId {
        AccountId::native(self.address)
    }

    /// The committed vault state.
    pub fn state(&self, view: &dyn StateView) -> Result<VaultState, VaultError> {
        let bytes = view
            .account(&self.state_account())
            .map(|a| a.app_state.as_slice())
            .unwrap_or(&[]);
        VaultState::decode(bytes)
    }

    /// Custody of the bound token.
    pub fn escrow(&self, view: &dyn StateView) -> Result<EscrowAccount, VaultError> {
        let token = self.state(view)?.bound_token.ok_or(VaultError::NotInitialized)?;
        Ok(EscrowAccount::new(self.address, token))
    }

    /// Vault state plus the version it was read at.
    fn pinned_state(&self, env: &CallEnv<'_>) -> Result<(VaultState, u64), VaultError> {
        let version = env.pinned(self.state_account()).version;
        Ok((self.state(env.view())?, version))
    }

    /// The attested root that writes `state` back, pinned to `version`,
    /// carrying `native_delta` into the vault's native balance.
    fn state_update(
        &self,
        state: &VaultState,
        version: u64,
        native_delta: u64,
        children: AccountUpdateForest,
    ) -> Result<AccountUpdate, VaultError> {
        Ok(AccountUpdate::credit(self.state_account(), native_delta)
            .require_version(version)
            .set_app_state(state.encode()?)
            .with_children(children)
            .attest(&self.key)?)
    }

    /// Binds the vault to `token`. Permitted once.
    pub fn initialize(&self, env: &CallEnv<'_>, token: TokenId) -> Result<AccountUpdateForest, VaultError> {
        let (state, version) = self.pinned_state(env)?;
        if let Some(bound) = state.bound_token {
            return Err(VaultError::AlreadyInitialized { bound });
        }

        let ledger = TokenLedger::for_token(env.view(), token).map_err(|_| VaultError::InvalidToken(token))?;
        if token.is_native() || ledger.is_liquidity_share(env.view()) {
            return Err(VaultError::InvalidToken(token));
        }

        let next = VaultState {
            bound_token: Some(token),
            ..state
        };
        tracing::info!(vault = %self.address, %token, "vault initialization prepared");
        Ok(vec![self.state_update(&next, version, 0, AccountUpdateForest::new())?].into())
    }

    /// Deposits `amount_token` of the bound token and `amount_native` of the
    /// native asset from the caller, minting the sum as shares to the caller.
    pub fn deposit(
        &self,
        env: &CallEnv<'_>,
        amount_token: u64,
        amount_native: u64,
    ) -> Result<AccountUpdateForest, VaultError> {
        if amount_token == 0 || amount_native == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let (state, version) = self.pinned_state(env)?;
        let token = state.bound_token.ok_or(VaultError::NotInitialized)?;

        let shares = amount_token
            .checked_add(amount_native)
            .ok_or(VaultError::Overflow)?;
        let liquidity_supply = state
            .liquidity_supply
            .checked_add(shares)
            .ok_or(VaultError::Overflow)?;
        let next = VaultState {
            liquidity_supply,
            ..state
        };

        let sender = env.sender();
        let payer = env.pinned(AccountId::native(sender));
        let bound = TokenLedger::for_token(env.view(), token)?;

        let mut parts = AccountUpdateForest::new();
        parts.push(
            AccountUpdate::debit(payer.account, amount_native)
                .authorized(Authorization::Signature)
                .require_version(payer.version),
        );
        parts.extend(bound.transfer(env, sender, self.address, amount_token)?);
        parts.extend(self.shares.mint(env, &self.mint, sender, shares)?);
        let root = self.state_update(&next, version, amount_native, parts)?;

        tracing::info!(
            vault = %self.address,
            %sender,
            amount_token,
            amount_native,
            shares,
            liquidity_supply,
            "deposit prepared"
        );
        Ok(vec![root].into())
    }

    /// Pays `amount` of the bound token out of custody to the caller.
    pub fn withdraw(&self, env: &CallEnv<'_>, amount: u64) -> Result<AccountUpdateForest, VaultError> {
        let (state, version) = self.pinned_state(env)?;
        let token = state.bound_token.ok_or(VaultError::NotInitialized)?;

        let escrow = EscrowAccount::new(self.address, token);
        let custody = escrow.balance(env);
        if custody.balance < amount {
            return Err(VaultError::InsufficientPoolBalance {
                available: custody.balance,
                requested: amount,
            });
        }

        let sender = env.sender();
        let bound = TokenLedger::for_token(env.view(), token)?;
        let payout: AccountUpdateForest = vec![
            escrow.debit(env, amount)?,
            AccountUpdate::credit(AccountId::new(sender, token), amount),
        ]
        .into();

        // No state change, but the root still pins the state we checked.
        let root = AccountUpdate::new(self.state_account())
            .require_version(version)
            .with_children(vec![bound.approve_compound(env, payout)?].into())
            .attest(&self.key)?;

        tracing::info!(vault = %self.address, %sender, amount, "withdrawal prepared");
        Ok(vec![root].into())
    }

    /// Approves holders moving shares among themselves.
    pub fn approve_shares(&self, env: &CallEnv<'_>, forest: AccountUpdateForest) -> Result<AccountUpdate, VaultError> {
        Ok(self.shares.approve_compound(env, forest)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_protocol::config::LedgerConfig;
    use lumina_protocol::crypto::Keypair;
    use lumina_protocol::ledger::LedgerState;

    fn ledger() -> Ledger {
        Ledger::new(LedgerState::new(), LedgerConfig::default())
    }

    #[test]
    fn fresh_vault_is_uninitialized() {
        let ledger = ledger();
        let vault = Vault::deploy(&ledger, Keypair::from_seed(&[5u8; 32])).unwrap();
        let snapshot = ledger.snapshot();

        assert_eq!(vault.state(&snapshot).unwrap(), VaultState::default());
        assert!(matches!(vault.escrow(&snapshot), Err(VaultError::NotInitialized)));
        assert_eq!(
            ledger.token(&vault.share_token()).unwrap().symbol,
            LIQUIDITY_SHARE_SYMBOL
        );
    }

    #[test]
    fn deploy_twice_rejected() {
        let ledger = ledger();
        let key = Keypair::from_seed(&[5u8; 32]);
        Vault::deploy(&ledger, key.clone()).unwrap();
        let err = Vault::deploy(&ledger, key).unwrap_err();
        assert!(matches!(
            err,
            VaultError::Token(TokenError::Deploy(StateError::ContractAlreadyDeployed(_)))
        ));
        assert_eq!(err.kind(), RejectionKind::InvalidTransaction);
    }

    #[test]
    fn cannot_bind_native_unknown_or_shares() {
        let ledger = ledger();
        let vault = Vault::deploy(&ledger, Keypair::from_seed(&[5u8; 32])).unwrap();
        let other = Vault::deploy(&ledger, Keypair::from_seed(&[6u8; 32])).unwrap();
        let snapshot = ledger.snapshot();
        let env = CallEnv::new(&snapshot, vault.address());
        let unknown = TokenId::derive(&Keypair::from_seed(&[7u8; 32]).address(), &TokenId::NATIVE);

        for token in [TokenId::NATIVE, unknown, vault.share_token(), other.share_token()] {
            let err = vault.initialize(&env, token).unwrap_err();
            assert!(matches!(err, VaultError::InvalidToken(t) if t == token));
        }
    }

    #[test]
    fn zero_amount_checked_before_initialization() {
        let ledger = ledger();
        let vault = Vault::deploy(&ledger, Keypair::from_seed(&[5u8; 32])).unwrap();
        let snapshot = ledger.snapshot();
        let env = CallEnv::new(&snapshot, Keypair::from_seed(&[1u8; 32]).address());

        assert_eq!(vault.deposit(&env, 0, 10).unwrap_err().kind(), RejectionKind::ZeroAmount);
        assert_eq!(vault.deposit(&env, 10, 0).unwrap_err().kind(), RejectionKind::ZeroAmount);
        assert_eq!(vault.deposit(&env, 10, 10).unwrap_err().kind(), RejectionKind::NotInitialized);
        assert_eq!(vault.withdraw(&env, 1).unwrap_err().kind(), RejectionKind::NotInitialized);
    }

    #[test]
    fn initialization_is_one_attested_update() {
        let ledger = ledger();
        let vault = Vault::deploy(&ledger, Keypair::from_seed(&[5u8; 32])).unwrap();
        let (token, _mint) = TokenLedger::deploy(&ledger, Keypair::from_seed(&[7u8; 32]).address(), "TV2").unwrap();
        let snapshot = ledger.snapshot();
        let env = CallEnv::new(&snapshot, Keypair::from_seed(&[1u8; 32]).address());

        let forest = vault.initialize(&env, token.token_id()).unwrap();
        assert_eq!(forest.roots().len(), 1);
        let root = &forest.roots()[0];
        assert_eq!(root.account, vault.state_account());
        assert_eq!(root.authorization, Authorization::Proof);
        assert!(root.is_attested());
        assert!(root.precondition.is_some());

        let state = VaultState::decode(root.app_state.as_deref().unwrap()).unwrap();
        assert_eq!(state.bound_token, Some(token.token_id()));
    }

    #[test]
    fn state_encoding_roundtrip() {
        let state = VaultState {
            bound_token: Some(TokenId::derive(&Keypair::from_seed(&[7u8; 32]).address(), &TokenId::NATIVE)),
            liquidity_supply: 20,
        };
        assert_eq!(VaultState::decode(&state.encode().unwrap()).unwrap(), state);
        assert!(matches!(VaultState::decode(&[0xFF]), Err(VaultError::CorruptState(_))));
    }
}
