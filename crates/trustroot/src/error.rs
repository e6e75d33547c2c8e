//! Error types for trustroot operations.

use std::path::PathBuf;

use thiserror::Error;
use trustroot_core::{CoreError, Id};
use trustroot_seal::{EntityKind, SealError};
use trustroot_store::StoreError;
use trustroot_x509::X509Error;

/// Errors that can occur during trustroot operations.
#[derive(Debug, Error)]
pub enum TrustError {
    /// Missing or malformed parameter. Raised before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// Index or primitive error, including name lookups.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Signature, authentication or decryption failure.
    #[error("crypto error: {0}")]
    Seal(#[from] SealError),

    /// Store or queue error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Certificate material error.
    #[error("x509 error: {0}")]
    X509(#[from] X509Error),

    /// This home holds no identity for the requested role.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// A delivered certificate matches no outstanding CSR.
    #[error("certificate {0} matches no outstanding CSR")]
    UnmatchedCertificate(Id),

    /// A handshake carried the wrong kind of entity.
    #[error("expected {expected} identity, found {found}")]
    UnexpectedEntity {
        expected: EntityKind,
        found: EntityKind,
    },

    /// A handshake answered for a different organization.
    #[error("expected organization {expected}, found {found}")]
    OrganizationMismatch { expected: Id, found: Id },

    /// Reading or writing a PEM file failed.
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl TrustError {
    /// Whether the error is a missing store document.
    pub fn is_store_not_found(&self) -> bool {
        matches!(self, TrustError::Store(err) if err.is_not_found())
    }
}

/// Result type for trustroot operations.
pub type Result<T> = std::result::Result<T, TrustError>;

pub(crate) fn validation(message: impl Into<String>) -> TrustError {
    TrustError::Validation(message.into())
}
