//! # trustroot-x509
//!
//! X.509 material for trustroot: root and imported certificate
//! authorities, end-entity certificates and certificate signing requests.
//!
//! Values here are plain data. Storage, indexing and encryption happen in
//! the `trustroot` crate.
//!
//! ```no_run
//! use trustroot_x509::{Ca, Csr, DnScope, KeyType};
//!
//! let ca = Ca::generate_root("root", 3650, 365, KeyType::Ed25519, DnScope::default())?;
//! let csr = Csr::generate("node-1", &DnScope::default(), KeyType::EcdsaP256)?;
//! let cert = ca.sign(&csr.public(), false)?;
//! assert_eq!(cert.id, csr.id);
//! # Ok::<(), trustroot_x509::X509Error>(())
//! ```

pub mod ca;
pub mod certificate;
pub mod csr;
pub mod error;
pub mod pem;
pub mod types;

pub use ca::Ca;
pub use certificate::Certificate;
pub use csr::Csr;
pub use error::{Result, X509Error};
pub use pem::{certificate_validity, Validity};
pub use types::{DnScope, KeyType};
