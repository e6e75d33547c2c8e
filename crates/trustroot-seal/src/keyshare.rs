//! Content keys wrapped for individual recipients.
//!
//! A sealed body is encrypted once. Each recipient gets a `KeyShare`: the
//! content key encrypted under a key agreed between a throwaway X25519 secret
//! and the recipient's long-lived public key, bound to the recipient id.

use serde::{Deserialize, Serialize};
use trustroot_core::Id;

use crate::crypto::{EncryptionKey, EphemeralKeyPair, X25519PublicKey, X25519StaticSecret};
use crate::envelope::EncryptedPayload;
use crate::error::{Result, SealError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShare {
    pub recipient: Id,
    /// Sender half of the agreement; the secret half is dropped after wrapping.
    pub ephemeral: X25519PublicKey,
    pub wrapped: EncryptedPayload,
}

impl KeyShare {
    pub fn wrap(
        recipient: Id,
        recipient_key: &X25519PublicKey,
        content_key: &EncryptionKey,
    ) -> Result<Self> {
        let sender = EphemeralKeyPair::generate();
        let ephemeral = sender.public_key();
        let wrap_key = sender
            .diffie_hellman(recipient_key)
            .derive_encryption_key(recipient.as_bytes());

        Ok(Self {
            recipient,
            ephemeral,
            wrapped: EncryptedPayload::encrypt(content_key.as_bytes(), &wrap_key)?,
        })
    }

    /// Recover the content key. Fails for any secret but the recipient's, or
    /// if `recipient` was rewritten after wrapping.
    pub fn unwrap_key(&self, secret: &X25519StaticSecret) -> Result<EncryptionKey> {
        let wrap_key = secret
            .diffie_hellman(&self.ephemeral)
            .derive_encryption_key(self.recipient.as_bytes());
        let bytes = self.wrapped.decrypt(&wrap_key)?;

        <[u8; 32]>::try_from(bytes.as_slice())
            .map(EncryptionKey::from_bytes)
            .map_err(|_| SealError::Decryption(format!("content key is {} bytes", bytes.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share_for(secret: &X25519StaticSecret, key: &EncryptionKey) -> KeyShare {
        KeyShare::wrap(Id::generate(), &secret.public_key(), key).unwrap()
    }

    #[test]
    fn test_recipient_recovers_content_key() {
        let secret = X25519StaticSecret::generate();
        let key = EncryptionKey::generate();
        let share = share_for(&secret, &key);
        assert_eq!(share.unwrap_key(&secret).unwrap().as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_other_secret_rejected() {
        let share = share_for(&X25519StaticSecret::generate(), &EncryptionKey::generate());
        assert!(share.unwrap_key(&X25519StaticSecret::generate()).is_err());
    }

    #[test]
    fn test_readdressed_share_rejected() {
        let secret = X25519StaticSecret::generate();
        let mut share = share_for(&secret, &EncryptionKey::generate());
        share.recipient = Id::generate();
        assert!(share.unwrap_key(&secret).is_err());
    }

    #[test]
    fn test_each_share_uses_fresh_ephemeral() {
        let secret = X25519StaticSecret::generate();
        let key = EncryptionKey::generate();
        assert_ne!(share_for(&secret, &key).ephemeral, share_for(&secret, &key).ephemeral);
    }
}
