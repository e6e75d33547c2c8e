//! Error types for sealing and opening containers.

use thiserror::Error;
use trustroot_core::{CoreError, Id};

use crate::container::SealMode;

/// Errors that can occur while sealing, opening or verifying containers.
#[derive(Debug, Error)]
pub enum SealError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Pairing-key MAC did not match.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Ed25519 signature did not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// The container was produced by someone else.
    #[error("container signed by {found}, expected {expected}")]
    SignerMismatch { expected: Id, found: Id },

    /// The container is not sealed the way the caller expects.
    #[error("unexpected container mode: expected {expected:?}, found {found:?}")]
    UnexpectedMode { expected: SealMode, found: SealMode },

    /// The container's `key-id` input is missing or malformed.
    #[error("missing or invalid key-id")]
    MissingKeyId,

    /// The container's `key-id` does not name this pairing key.
    #[error("key-id {found} does not match pairing key {expected}")]
    KeyIdMismatch { expected: Id, found: Id },

    /// No key share addressed to this identity.
    #[error("{0} is not a recipient of this container")]
    NotARecipient(Id),

    /// Stored entity document is inconsistent or lacks secrets.
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// Core error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for seal operations.
pub type Result<T> = std::result::Result<T, SealError>;
