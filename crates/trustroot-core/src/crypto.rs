//! Ed25519 signing for entities and containers.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Signature verification half of an entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First eight bytes in hex, for logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Check `signature` over `message`.
    ///
    /// Bytes that are not a curve point give `InvalidPublicKey`; a
    /// signature that does not match gives `InvalidSignature`.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CoreError> {
        VerifyingKey::from_bytes(&self.0)
            .map_err(|_| CoreError::InvalidPublicKey)?
            .verify(message, &Signature::from_bytes(&signature.0))
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({})", self.fingerprint())
    }
}

/// Signature bytes as carried in a container.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    /// Read a container's signature field. Anything but 64 bytes is rejected.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        <[u8; 64]>::try_from(bytes)
            .map(Self)
            .map_err(|_| CoreError::InvalidSignature)
    }

    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Signature({}..)", hex::encode(&self.0[..8]))
    }
}

/// An entity's signing key. Only the seed is persisted.
#[derive(Clone)]
pub struct Keypair(SigningKey);

impl Keypair {
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut rand::thread_rng()))
    }

    /// Restore from the seed stored in an entity document.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    pub fn seed(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.0.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.0.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Keypair").field(&self.public_key()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_binds_message_and_key() {
        let signer = Keypair::generate();
        let signature = signer.sign(b"index v1");

        assert!(signer.public_key().verify(b"index v1", &signature).is_ok());
        assert!(signer.public_key().verify(b"index v2", &signature).is_err());
        assert!(Keypair::generate()
            .public_key()
            .verify(b"index v1", &signature)
            .is_err());
    }

    #[test]
    fn test_seed_restores_same_key() {
        let original = Keypair::generate();
        let restored = Keypair::from_seed(&original.seed());
        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn test_signature_length_checked() {
        assert!(Ed25519Signature::from_slice(&[0u8; 63]).is_err());
        let signature = Keypair::generate().sign(b"x");
        assert_eq!(Ed25519Signature::from_slice(&signature.to_vec()).unwrap(), signature);
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = Keypair::generate();
        let debug = format!("{keypair:?}");
        assert!(!debug.contains(&hex::encode(keypair.seed())));
        assert!(debug.contains(&keypair.public_key().fingerprint()));
    }
}
