//! Error types for core primitives.

use thiserror::Error;

use crate::index::ResourceClass;

/// Errors raised by core primitives and the Trust Index.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// Public key bytes do not form a valid Ed25519 point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Malformed identifier.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// CBOR encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Name is not present in the index for this class.
    #[error("{class} '{name}' not found")]
    NotFound { class: ResourceClass, name: String },

    /// Name is already bound to another id in this class.
    #[error("{class} '{name}' already exists")]
    DuplicateName { class: ResourceClass, name: String },

    /// No pairing key with this id.
    #[error("pairing key {0} not found")]
    PairingKeyNotFound(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
