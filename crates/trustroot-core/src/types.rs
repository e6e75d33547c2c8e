//! Strong identifier type.
//!
//! Every stored object (entity, CA, certificate, CSR, index, pairing key) is
//! addressed by an [`Id`]. Ids are random, not content-derived.

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A 16-byte identifier, rendered as 32 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub [u8; 16]);

impl Id {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Derive a well-known id from a parent id and a label.
    ///
    /// Used for documents with a fixed slot, such as an organization's index.
    pub fn derive(parent: &Id, label: &str) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("trustroot-v1 well-known id");
        hasher.update(&parent.0);
        hasher.update(label.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CoreError::InvalidId(e.to_string()))?;
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidId(format!("expected 16 bytes in '{}'", s)))?;
        Ok(Self(arr))
    }

    /// The zero id.
    pub const ZERO: Self = Self([0u8; 16]);
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Id {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 16]> for Id {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Id {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = slice
            .try_into()
            .map_err(|_| CoreError::InvalidId(format!("expected 16 bytes, got {}", slice.len())))?;
        Ok(Self(arr))
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Id::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_hex_roundtrip() {
        let id = Id::from_bytes([0x42; 16]);
        let recovered = Id::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_id_display_is_full_hex() {
        let id = Id::from_bytes([0xab; 16]);
        assert_eq!(id.to_string(), "ab".repeat(16));
    }

    #[test]
    fn test_id_rejects_wrong_length() {
        assert!(Id::from_hex("abcd").is_err());
        assert!(Id::from_hex("not hex at all").is_err());
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(Id::generate(), Id::generate());
    }

    #[test]
    fn test_derive_is_deterministic() {
        let parent = Id::from_bytes([0x01; 16]);
        assert_eq!(Id::derive(&parent, "index"), Id::derive(&parent, "index"));
        assert_ne!(Id::derive(&parent, "index"), Id::derive(&parent, "config"));
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = Id::from_bytes([0x0f; 16]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "0f".repeat(16)));
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
