//! Transaction signing with Ed25519 keypairs.
//!
//! Each owner whose update claims `Signature` authorization signs the
//! transaction digest and attaches the result under its own address.
//! Signing never changes the digest, so owners may sign in any order.

use super::builder::{Transaction, TransactionError};
use crate::crypto::Keypair;

/// Signs `tx` with `keypair` and stores the signature under the keypair's
/// address, replacing any earlier signature by the same owner.
///
/// ```
/// use lumina_protocol::crypto::Keypair;
/// use lumina_protocol::transaction::{sign_transaction, TransactionBuilder};
///
/// let kp = Keypair::generate();
/// let mut tx = TransactionBuilder::new(kp.address()).build();
/// sign_transaction(&mut tx, &kp).unwrap();
/// assert!(tx.is_signed_by(&kp.address()));
/// ```
pub fn sign_transaction<'a>(
    tx: &'a mut Transaction,
    keypair: &Keypair,
) -> Result<&'a Transaction, TransactionError> {
    let digest = tx.digest()?;
    tx.signatures.insert(keypair.address(), keypair.sign(&digest));
    Ok(tx)
}

impl Transaction {
    /// Consuming form of [`sign_transaction`], for chaining.
    pub fn signed_by(mut self, keypair: &Keypair) -> Result<Self, TransactionError> {
        sign_transaction(&mut self, keypair)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify;
    use crate::transaction::TransactionBuilder;

    #[test]
    fn signature_verifies_over_digest() {
        let kp = Keypair::generate();
        let tx = TransactionBuilder::new(kp.address())
            .memo("x")
            .build()
            .signed_by(&kp)
            .unwrap();

        let sig = &tx.signatures[&kp.address()];
        assert!(verify(&kp.address(), &tx.digest().unwrap(), sig).is_ok());
    }

    #[test]
    fn signing_order_does_not_matter() {
        let a = Keypair::from_seed(&[1u8; 32]);
        let b = Keypair::from_seed(&[2u8; 32]);
        let base = TransactionBuilder::new(a.address()).memo("both").build();

        let ab = base.clone().signed_by(&a).unwrap().signed_by(&b).unwrap();
        let ba = base.signed_by(&b).unwrap().signed_by(&a).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn resigning_replaces() {
        let kp = Keypair::generate();
        let mut tx = TransactionBuilder::new(kp.address()).build();
        sign_transaction(&mut tx, &kp).unwrap();
        sign_transaction(&mut tx, &kp).unwrap();
        assert_eq!(tx.signatures.len(), 1);
    }
}
