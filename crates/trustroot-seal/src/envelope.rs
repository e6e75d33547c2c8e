//! The encrypted body of a sealed container.

use serde::{Deserialize, Serialize};

use crate::crypto::{EncryptionKey, EncryptionNonce};
use crate::error::Result;

/// Cipher tag carried with every payload so old containers stay readable if
/// another cipher is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionFormat {
    ChaCha20Poly1305,
}

/// Ciphertext with its nonce. The key travels separately: wrapped per
/// recipient, or derived from a pairing secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub format: EncryptionFormat,
    pub nonce: EncryptionNonce,
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        Ok(Self {
            format: EncryptionFormat::ChaCha20Poly1305,
            ciphertext: key.encrypt(plaintext, &nonce)?,
            nonce,
        })
    }

    pub fn decrypt(&self, key: &EncryptionKey) -> Result<Vec<u8>> {
        match self.format {
            EncryptionFormat::ChaCha20Poly1305 => key.decrypt(&self.ciphertext, &self.nonce),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_opens_with_its_key_only() {
        let key = EncryptionKey::generate();
        let payload = EncryptedPayload::encrypt(b"csr", &key).unwrap();
        assert_eq!(payload.decrypt(&key).unwrap(), b"csr");
        assert!(payload.decrypt(&EncryptionKey::generate()).is_err());
    }

    #[test]
    fn test_same_plaintext_differs() {
        let key = EncryptionKey::generate();
        let a = EncryptedPayload::encrypt(b"same", &key).unwrap();
        let b = EncryptedPayload::encrypt(b"same", &key).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }
}
