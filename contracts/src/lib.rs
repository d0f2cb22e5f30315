//! # Lumina Pool Contracts
//!
//! Contract logic for a single-token liquidity pool on the Lumina ledger:
//!
//! - **Token Ledger**: mint and transfer for one custom token, and the
//!   issuer's compound approval that every movement of the token needs.
//! - **Escrow Account**: the vault's custody of its bound token; only the
//!   vault can debit it.
//! - **Vault**: binds a token, takes deposits of that token plus the native
//!   asset, issues liquidity shares, and pays withdrawals out of custody.
//!
//! ## Design Principles
//!
//! 1. Contracts do not mutate anything. Each method reads a [`CallEnv`] and
//!    returns the account updates that would carry out the operation; the
//!    caller assembles them into one transaction and the ledger settles it
//!    atomically or rejects it whole.
//! 2. Every read an output depends on is pinned by account version.
//! 3. All amount arithmetic is checked; money and wrapping arithmetic do
//!    not mix.
//! 4. Privileged operations are gated by capabilities, not address lists.
//! 5. Anything a contract authorizes on its own accounts is attested with
//!    its key; unattested contract updates are limited to issuer approvals
//!    the ledger can re-check.
//!
//! ```text
//! client ──► Vault::deposit(env, 10, 10)
//!              └─ vault state update        (+10 native, pinned, attested by the vault key)
//!                   ├─ caller native debit  (-10, Signature, pinned)
//!                   ├─ TokenLedger::transfer (issuer approval: caller -10, custody +10)
//!                   └─ shares mint          (vault approval: caller +20)
//!        ──► Transaction ──► Ledger::submit ──► Receipt | Rejection
//! ```

pub mod env;
pub mod escrow;
pub mod token_ledger;
pub mod vault;

pub use env::{CallEnv, PinnedBalance};
pub use escrow::{EscrowAccount, EscrowError};
pub use token_ledger::{MintCapability, TokenError, TokenLedger};
pub use vault::{Vault, VaultError, VaultState};
