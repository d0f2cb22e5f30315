//! # Protocol Configuration & Constants
//!
//! Every fixed number the ledger depends on lives here, next to the
//! runtime [`LedgerConfig`] that operators may tune. Constants that feed
//! into hashes (domain separation contexts) are consensus-critical:
//! changing one changes every derived token id.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Rejection, RejectionKind};
use crate::logging::LogFormat;

// ---------------------------------------------------------------------------
// Domain Separation
// ---------------------------------------------------------------------------

/// BLAKE3 `derive_key` context for custom token ids.
pub const TOKEN_ID_CONTEXT: &str = "lumina 2026 token id v1";

/// BLAKE3 `derive_key` context for transaction digests (what signers sign).
pub const TRANSACTION_DIGEST_CONTEXT: &str = "lumina 2026 transaction digest v1";

/// BLAKE3 `derive_key` context for contract attestations of an account
/// update and everything under it.
pub const UPDATE_ATTESTATION_CONTEXT: &str = "lumina 2026 update attestation v1";

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Display symbol of the native settlement asset.
pub const NATIVE_SYMBOL: &str = "LUM";

/// Symbol registered for every pool's liquidity-share token.
pub const LIQUIDITY_SHARE_SYMBOL: &str = "LUM-LP";

/// Maximum token symbol length in bytes.
pub const MAX_SYMBOL_LENGTH: usize = 6;

// ---------------------------------------------------------------------------
// Forest Limits
// ---------------------------------------------------------------------------

/// Default maximum nesting depth of an account-update forest. A root is
/// depth 1, its children depth 2, and so on.
pub const DEFAULT_MAX_FOREST_DEPTH: usize = 8;

/// Default maximum number of account updates in a single transaction.
pub const DEFAULT_MAX_ACCOUNT_UPDATES: usize = 64;

/// Default log filter when neither the config nor `RUST_LOG` say otherwise.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default network name.
pub const DEFAULT_NETWORK: &str = "devnet";

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating a [`LedgerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config document is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the ledger cannot operate with.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        /// The offending field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl Rejection for ConfigError {
    fn kind(&self) -> RejectionKind {
        RejectionKind::Configuration
    }
}

/// Runtime parameters of a ledger instance.
///
/// Every field has a default, so a config file only needs to mention what
/// it changes:
///
/// ```
/// use lumina_protocol::config::LedgerConfig;
///
/// let config = LedgerConfig::from_json_str(r#"{ "network": "testnet" }"#).unwrap();
/// assert_eq!(config.network, "testnet");
/// assert_eq!(config.max_forest_depth, 8);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Free-form network name, used in logs only.
    pub network: String,
    /// Maximum nesting depth accepted by settlement.
    pub max_forest_depth: usize,
    /// Maximum number of account updates accepted in one transaction.
    pub max_account_updates: usize,
    /// Default `tracing` filter directive.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.to_string(),
            max_forest_depth: DEFAULT_MAX_FOREST_DEPTH,
            max_account_updates: DEFAULT_MAX_ACCOUNT_UPDATES,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl LedgerConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks that every limit is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_forest_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_forest_depth",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_account_updates == 0 {
            return Err(ConfigError::Invalid {
                field: "max_account_updates",
                reason: "must be at least 1".into(),
            });
        }
        if self.network.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "network",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Returns `true` if `symbol` is acceptable as a token symbol: 1 to
/// [`MAX_SYMBOL_LENGTH`] ASCII alphanumerics or dashes.
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LENGTH
        && symbol.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
