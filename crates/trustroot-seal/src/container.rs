//! The container envelope.
//!
//! Every object that leaves an entity (stored documents, queue items) travels
//! as a [`Container`]: a body plus signature metadata. The `key-id` input names
//! the key that produced the signature, so a receiver can pick the right
//! pairing key or public key before touching the body.
//!
//! The signature covers the CBOR encoding of every field except `signature`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trustroot_core::{from_cbor, to_cbor, Id};

use crate::envelope::EncryptedPayload;
use crate::error::{Result, SealError};
use crate::keyshare::KeyShare;

/// Current container format version.
pub const CONTAINER_VERSION: u8 = 1;

/// Signature input naming the signing key.
pub const KEY_ID: &str = "key-id";

/// Signature input naming the signature algorithm.
pub const SIGNATURE_ALGORITHM: &str = "signature-algorithm";

/// How a container body is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SealMode {
    /// Plaintext body, Ed25519 signature.
    Signed,
    /// [`SealedBody`], Ed25519 signature.
    SignedEncrypted,
    /// Pairing-key encrypted body, Blake3 keyed MAC.
    Authenticated,
}

impl SealMode {
    pub(crate) fn algorithm(self) -> &'static str {
        match self {
            SealMode::Signed | SealMode::SignedEncrypted => "ed25519",
            SealMode::Authenticated => "blake3-keyed",
        }
    }
}

/// A signed and possibly encrypted envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub version: u8,
    /// Entity that produced the container.
    pub source: Id,
    pub mode: SealMode,
    pub signature_inputs: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Serialize)]
struct SigningView<'a> {
    version: u8,
    source: &'a Id,
    mode: SealMode,
    signature_inputs: &'a BTreeMap<String, String>,
    body: &'a [u8],
}

/// Body of a [`SealMode::SignedEncrypted`] container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBody {
    pub payload: EncryptedPayload,
    pub shares: Vec<KeyShare>,
}

impl Container {
    /// Build an unsigned container.
    pub fn unsigned(source: Id, mode: SealMode, key_id: &Id, body: Vec<u8>) -> Self {
        let mut signature_inputs = BTreeMap::new();
        signature_inputs.insert(KEY_ID.to_string(), key_id.to_hex());
        signature_inputs.insert(SIGNATURE_ALGORITHM.to_string(), mode.algorithm().to_string());

        Self {
            version: CONTAINER_VERSION,
            source,
            mode,
            signature_inputs,
            body,
            signature: Vec::new(),
        }
    }

    /// Bytes covered by the signature or MAC.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        Ok(to_cbor(&SigningView {
            version: self.version,
            source: &self.source,
            mode: self.mode,
            signature_inputs: &self.signature_inputs,
            body: &self.body,
        })?)
    }

    /// The key that produced the signature.
    pub fn key_id(&self) -> Result<Id> {
        self.signature_inputs
            .get(KEY_ID)
            .and_then(|hex| Id::from_hex(hex).ok())
            .ok_or(SealError::MissingKeyId)
    }

    /// Fail unless the container is sealed with `expected`.
    pub fn expect_mode(&self, expected: SealMode) -> Result<()> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(SealError::UnexpectedMode {
                expected,
                found: self.mode,
            })
        }
    }

    /// Decode the body of a [`SealMode::SignedEncrypted`] container.
    pub fn sealed_body(&self) -> Result<SealedBody> {
        self.expect_mode(SealMode::SignedEncrypted)?;
        Ok(from_cbor(&self.body)?)
    }

    /// Ids this container is encrypted for.
    pub fn recipients(&self) -> Result<Vec<Id>> {
        Ok(self
            .sealed_body()?
            .shares
            .iter()
            .map(|s| s.recipient)
            .collect())
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(to_cbor(self)?)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(from_cbor(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_recorded() {
        let key_id = Id::generate();
        let container = Container::unsigned(Id::generate(), SealMode::Signed, &key_id, vec![1, 2]);
        assert_eq!(container.key_id().unwrap(), key_id);
        assert_eq!(container.signature_inputs[SIGNATURE_ALGORITHM], "ed25519");
    }

    #[test]
    fn test_missing_key_id() {
        let mut container =
            Container::unsigned(Id::generate(), SealMode::Signed, &Id::generate(), vec![]);
        container.signature_inputs.remove(KEY_ID);
        assert!(matches!(container.key_id(), Err(SealError::MissingKeyId)));
    }

    #[test]
    fn test_signing_bytes_cover_body() {
        let mut container =
            Container::unsigned(Id::generate(), SealMode::Signed, &Id::generate(), vec![1]);
        let before = container.signing_bytes().unwrap();
        container.body = vec![2];
        assert_ne!(before, container.signing_bytes().unwrap());

        // The signature itself is not covered.
        let after = container.signing_bytes().unwrap();
        container.signature = vec![9; 64];
        assert_eq!(after, container.signing_bytes().unwrap());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let container =
            Container::unsigned(Id::generate(), SealMode::Authenticated, &Id::generate(), vec![7]);
        let restored = Container::from_bytes(&container.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, container);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(Container::from_bytes(b"definitely not cbor").is_err());
    }
}
