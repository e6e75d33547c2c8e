//! Key agreement and symmetric encryption used by sealed containers.
//!
//! Entities hold a long-lived X25519 secret. Each sealed container gets a
//! fresh content key; that key is wrapped per recipient under a key derived
//! from an ephemeral-static X25519 exchange.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{Result, SealError};

/// Context string for key-wrapping keys.
const WRAP_CONTEXT: &str = "trustroot-seal-v1 key wrap";

fn random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

// ─────────────────────────────────────────────────────────────────────────────
// X25519
// ─────────────────────────────────────────────────────────────────────────────

/// Public encryption half of an entity.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519PublicKey({})", hex::encode(&self.0[..8]))
    }
}

impl From<&X25519PublicKey> for PublicKey {
    fn from(key: &X25519PublicKey) -> Self {
        PublicKey::from(key.0)
    }
}

/// Long-lived decryption secret of an entity.
#[derive(Clone)]
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::thread_rng()))
    }

    /// Restore from the bytes stored in an entity document.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(PublicKey::from(&self.0).to_bytes())
    }

    /// Recipient side of a key share.
    pub fn diffie_hellman(&self, ephemeral: &X25519PublicKey) -> SharedKey {
        SharedKey(self.0.diffie_hellman(&ephemeral.into()).to_bytes())
    }
}

/// Single-use secret for the sending side of a key share.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey(PublicKey::from(&secret).to_bytes());
        Self { secret, public }
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Consumes the secret; it cannot be reused for a second recipient.
    pub fn diffie_hellman(self, recipient: &X25519PublicKey) -> SharedKey {
        SharedKey(self.secret.diffie_hellman(&recipient.into()).to_bytes())
    }
}

/// Output of an X25519 exchange. Only used to derive wrapping keys.
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Wrapping key bound to `context`, normally the recipient id.
    pub fn derive_encryption_key(&self, context: &[u8]) -> EncryptionKey {
        let mut hasher = blake3::Hasher::new_derive_key(WRAP_CONTEXT);
        hasher.update(&self.0);
        hasher.update(context);
        EncryptionKey(*hasher.finalize().as_bytes())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ChaCha20-Poly1305
// ─────────────────────────────────────────────────────────────────────────────

/// Content or wrapping key.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn generate() -> Self {
        Self(random())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(&self.0.into())
    }

    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.cipher()
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| SealError::Encryption(e.to_string()))
    }

    /// Fails if the key is wrong or the ciphertext was altered.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| SealError::Decryption(e.to_string()))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    pub fn generate() -> Self {
        Self(random())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_agreement() {
        let recipient = X25519StaticSecret::generate();
        let sender = EphemeralKeyPair::generate();
        let sender_public = sender.public_key();

        let sent = sender.diffie_hellman(&recipient.public_key());
        let received = recipient.diffie_hellman(&sender_public);
        assert_eq!(
            sent.derive_encryption_key(b"bob").as_bytes(),
            received.derive_encryption_key(b"bob").as_bytes()
        );
        assert_ne!(
            sent.derive_encryption_key(b"bob").as_bytes(),
            received.derive_encryption_key(b"carol").as_bytes()
        );
    }

    #[test]
    fn test_secret_restores_public_key() {
        let secret = X25519StaticSecret::generate();
        let restored = X25519StaticSecret::from_bytes(secret.to_bytes());
        assert_eq!(secret.public_key(), restored.public_key());
    }

    #[test]
    fn test_ciphertext_needs_key_and_nonce() {
        let key = EncryptionKey::generate();
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(b"org document", &nonce).unwrap();

        assert_eq!(key.decrypt(&ciphertext, &nonce).unwrap(), b"org document");
        assert!(EncryptionKey::generate().decrypt(&ciphertext, &nonce).is_err());
        assert!(key.decrypt(&ciphertext, &EncryptionNonce::generate()).is_err());
    }

    #[test]
    fn test_tampering_detected() {
        let key = EncryptionKey::generate();
        let nonce = EncryptionNonce::generate();
        let mut ciphertext = key.encrypt(b"index", &nonce).unwrap();
        ciphertext[0] ^= 1;
        assert!(matches!(
            key.decrypt(&ciphertext, &nonce),
            Err(SealError::Decryption(_))
        ));
    }
}
