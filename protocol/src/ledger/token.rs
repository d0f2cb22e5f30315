//! # Token Identity
//!
//! A [`TokenId`] names a token kind. There is exactly one native settlement
//! asset, [`TokenId::NATIVE`]; every other token is owned by an issuer
//! account and its id is derived from that account:
//!
//! ```text
//! TokenId::derive(issuer, parent) = BLAKE3_derive_key(TOKEN_ID_CONTEXT, issuer || parent)
//! ```
//!
//! Because the id is a pure function of its issuer, nobody can register a
//! second token under someone else's id, and any party can recompute which
//! account must approve movements of a given token.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::config::TOKEN_ID_CONTEXT;
use crate::crypto::hash::domain_separated_hash_multi;
use crate::crypto::Address;

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// A 32-byte token identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId([u8; 32]);

impl TokenId {
    /// The native settlement asset.
    pub const NATIVE: TokenId = TokenId([0u8; 32]);

    /// Creates a `TokenId` from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derives the id of the token issued by the account `(issuer, parent)`.
    pub fn derive(issuer: &Address, parent: &TokenId) -> Self {
        Self(domain_separated_hash_multi(
            TOKEN_ID_CONTEXT,
            &[issuer.as_bytes(), &parent.0],
        ))
    }

    /// Returns `true` for the native settlement asset.
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded token id.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded token id.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            return f.write_str("TokenId(native)");
        }
        write!(f, "TokenId({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for TokenId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

// ---------------------------------------------------------------------------
// TokenRecord
// ---------------------------------------------------------------------------

/// Registry entry for a custom token: who issues it and how much exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The token's id, `TokenId::derive(issuer, parent)`.
    pub token_id: TokenId,
    /// Owner of the issuing account.
    pub issuer: Address,
    /// Token of the issuing account. Always native for contracts deployed
    /// through [`super::LedgerState::deploy_contract`].
    pub parent: TokenId,
    /// Display symbol, e.g. `"TV2"`.
    pub symbol: String,
    /// Total minted supply. Never decreases: the ledger has no burn.
    pub total_supply: u64,
}

impl TokenRecord {
    /// The account whose update must directly parent every update of this
    /// token.
    pub fn issuer_account(&self) -> super::AccountId {
        super::AccountId::new(self.issuer, self.parent)
    }
}
