//! # Signature Verification
//!
//! The ledger never signs anything; it only checks. Verification uses
//! `ed25519-dalek`'s strict mode, which rejects the malleable edge cases
//! lenient implementations accept.

use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};
use thiserror::Error;

use super::keys::{Address, Signature};

/// Errors during signature verification.
///
/// Intentionally coarse: callers learn that a signature is bad, not why.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignatureBytes,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Verify a signature given raw byte components.
pub fn verify_raw(
    public_key_bytes: &[u8; 32],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), SignatureError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key_bytes).map_err(|_| SignatureError::InvalidPublicKey)?;

    let signature_bytes: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| SignatureError::InvalidSignatureBytes)?;
    let signature = DalekSignature::from_bytes(&signature_bytes);

    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

/// Verify `signature` over `message` against the key behind `address`.
pub fn verify(address: &Address, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
    verify_raw(address.as_bytes(), message, signature.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    #[test]
    fn sign_and_verify() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"deposit 10");
        assert!(verify(&kp.address(), b"deposit 10", &sig).is_ok());
    }

    #[test]
    fn wrong_message_fails() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"deposit 10");
        assert_eq!(
            verify(&kp.address(), b"deposit 11", &sig),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn wrong_key_fails() {
        let signer = Keypair::generate();
        let other = Keypair::generate();
        let sig = signer.sign(b"withdraw 5");
        assert!(verify(&other.address(), b"withdraw 5", &sig).is_err());
    }

    #[test]
    fn truncated_signature_rejected() {
        let kp = Keypair::generate();
        let sig = Signature::from_bytes(vec![0u8; 63]);
        assert_eq!(
            verify(&kp.address(), b"m", &sig),
            Err(SignatureError::InvalidSignatureBytes)
        );
    }
}
