//! # Hashing Utilities
//!
//! BLAKE3 is the only hash function the ledger uses. Anything that is
//! derived from a hash and could collide across purposes (token ids versus
//! transaction digests) goes through [`domain_separated_hash`], which uses
//! BLAKE3's `derive_key` mode rather than a hand-rolled prefix.

/// Compute the plain BLAKE3 hash of the input data.
///
/// ```
/// use lumina_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"lumina");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Compute a domain-separated BLAKE3 hash.
///
/// `domain_separated_hash("a", x)` and `domain_separated_hash("b", x)`
/// never collide, even for identical `x`.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Domain-separated hash over several byte slices, fed to the hasher in
/// order without an intermediate buffer.
///
/// Callers must only pass fixed-width parts (or length-prefix variable
/// ones); two different part lists with the same concatenation hash the
/// same.
pub fn domain_separated_hash_multi(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
