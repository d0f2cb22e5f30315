//! # Ledger
//!
//! Token identity, accounts, and the committed state they live in.
//!
//! ```text
//! token.rs   - TokenId derivation and the token registry entry
//! account.rs - AccountId (owner, token) and per-account state
//! state.rs   - LedgerState, the StateView read boundary, supply checks
//! shared.rs  - Ledger: a lock around LedgerState that serializes commits
//! ```

pub mod account;
pub mod shared;
pub mod state;
pub mod token;

pub use account::{Account, AccountId};
pub use shared::Ledger;
pub use state::{LedgerState, StateError, StateView};
pub use token::{TokenId, TokenRecord};
