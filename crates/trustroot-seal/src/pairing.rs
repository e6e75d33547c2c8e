//! Pairing keys: one-time symmetric credentials for first contact.
//!
//! A pairing key is an `(id, secret)` pair handed out of band. The secret is
//! stretched into two independent keys: one encrypts the body, the other MACs
//! the whole container. The MAC is checked before decryption.

use rand::RngCore;
use std::fmt;
use trustroot_core::Id;

use crate::container::{Container, SealMode};
use crate::crypto::EncryptionKey;
use crate::envelope::EncryptedPayload;
use crate::error::{Result, SealError};

/// A pairing (invite) key.
#[derive(Clone, PartialEq, Eq)]
pub struct PairingKey {
    pub id: Id,
    secret: String,
}

impl PairingKey {
    /// Generate a fresh random id and secret.
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self {
            id: Id::generate(),
            secret: hex::encode(secret),
        }
    }

    /// Rebuild from an id and the shared secret string.
    pub fn new(id: Id, secret: impl Into<String>) -> Self {
        Self {
            id,
            secret: secret.into(),
        }
    }

    /// The shared secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    fn encryption_key(&self) -> EncryptionKey {
        EncryptionKey::from_bytes(blake3::derive_key(
            "trustroot-seal-v1 pairing encryption",
            self.secret.as_bytes(),
        ))
    }

    fn mac_key(&self) -> [u8; 32] {
        blake3::derive_key("trustroot-seal-v1 pairing mac", self.secret.as_bytes())
    }

    /// Encrypt then authenticate `plaintext` on behalf of `source`.
    pub fn seal(&self, source: Id, plaintext: &[u8]) -> Result<Container> {
        let payload = EncryptedPayload::encrypt(plaintext, &self.encryption_key())?;
        let body = trustroot_core::to_cbor(&payload)?;

        let mut container = Container::unsigned(source, SealMode::Authenticated, &self.id, body);
        let mac = blake3::keyed_hash(&self.mac_key(), &container.signing_bytes()?);
        container.signature = mac.as_bytes().to_vec();
        Ok(container)
    }

    /// Verify the MAC, then decrypt.
    pub fn open(&self, container: &Container) -> Result<Vec<u8>> {
        container.expect_mode(SealMode::Authenticated)?;

        let key_id = container.key_id()?;
        if key_id != self.id {
            return Err(SealError::KeyIdMismatch {
                expected: self.id,
                found: key_id,
            });
        }

        let received: [u8; 32] = container
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| SealError::AuthenticationFailed)?;
        let expected = blake3::keyed_hash(&self.mac_key(), &container.signing_bytes()?);
        // blake3::Hash equality is constant time.
        if expected != blake3::Hash::from(received) {
            return Err(SealError::AuthenticationFailed);
        }

        let payload: EncryptedPayload = trustroot_core::from_cbor(&container.body)?;
        payload.decrypt(&self.encryption_key())
    }
}

impl fmt::Debug for PairingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairingKey({:?}, [redacted])", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = PairingKey::generate();
        let container = key.seal(Id::generate(), b"public identity").unwrap();

        assert_eq!(container.key_id().unwrap(), key.id);
        assert_eq!(key.open(&container).unwrap(), b"public identity");
    }

    #[test]
    fn test_same_id_and_secret_open() {
        let key = PairingKey::generate();
        let container = key.seal(Id::generate(), b"payload").unwrap();

        let copy = PairingKey::new(key.id, key.secret().to_string());
        assert_eq!(copy.open(&container).unwrap(), b"payload");
    }

    #[test]
    fn test_wrong_secret_is_authentication_error() {
        let key = PairingKey::generate();
        let container = key.seal(Id::generate(), b"payload").unwrap();

        let wrong = PairingKey::new(key.id, "not the secret");
        assert!(matches!(
            wrong.open(&container),
            Err(SealError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_wrong_id_is_rejected() {
        let key = PairingKey::generate();
        let container = key.seal(Id::generate(), b"payload").unwrap();

        let other = PairingKey::new(Id::generate(), key.secret().to_string());
        assert!(matches!(
            other.open(&container),
            Err(SealError::KeyIdMismatch { .. })
        ));
    }

    #[test]
    fn test_tampered_body_is_authentication_error() {
        let key = PairingKey::generate();
        let mut container = key.seal(Id::generate(), b"payload").unwrap();
        let last = container.body.len() - 1;
        container.body[last] ^= 0x01;

        assert!(matches!(
            key.open(&container),
            Err(SealError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = PairingKey::new(Id::generate(), "hunter2");
        assert!(!format!("{:?}", key).contains("hunter2"));
    }

    proptest! {
        #[test]
        fn roundtrip_recovers_bytes(payload in prop::collection::vec(any::<u8>(), 0..512)) {
            let key = PairingKey::generate();
            let container = key.seal(Id::generate(), &payload).unwrap();
            prop_assert_eq!(key.open(&container).unwrap(), payload);
        }
    }
}
