//! Error types for X.509 material.

use thiserror::Error;
use trustroot_core::CoreError;

use crate::types::KeyType;

/// Errors that can occur while generating, signing or importing X.509 material.
#[derive(Debug, Error)]
pub enum X509Error {
    /// Certificate generation or signing failed.
    #[error("certificate error: {0}")]
    Rcgen(#[from] rcgen::RcgenError),

    /// PEM or DER input could not be parsed.
    #[error("invalid PEM: {0}")]
    Pem(String),

    /// Unknown key type name.
    #[error("unsupported key type '{0}'")]
    UnsupportedKeyType(String),

    /// Keys of this type can be imported but not generated.
    #[error("cannot generate {0} keys")]
    KeyGenerationUnavailable(KeyType),

    /// Signing needs a private key the CA does not hold.
    #[error("CA '{0}' has no private key")]
    MissingPrivateKey(String),

    /// Core error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for X.509 operations.
pub type Result<T> = std::result::Result<T, X509Error>;
