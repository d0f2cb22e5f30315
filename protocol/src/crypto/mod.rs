//! # Cryptographic Primitives
//!
//! Identity and integrity for the ledger:
//!
//! - **Ed25519**: every owner (user or contract) is addressed by its
//!   public key, and `Signature` authorizations are Ed25519 signatures over
//!   the transaction digest.
//! - **BLAKE3**: token id derivation and transaction digests, always with
//!   a domain separation context from [`crate::config`].
//!
//! Everything here is a thin wrapper around `ed25519-dalek` and `blake3`.
//! Key storage is the wallet's job, not ours.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, domain_separated_hash, domain_separated_hash_multi};
pub use keys::{Address, KeyError, Keypair, Signature};
pub use signatures::{verify, verify_raw, SignatureError};
