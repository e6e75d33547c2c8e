//! # Trustroot Core
//!
//! Pure primitives for trustroot: identifiers, Ed25519 signing keys, tag
//! normalization and the organization's Trust Index document.
//!
//! This crate contains no I/O, no storage and no encryption. Encryption and
//! the container envelope live in `trustroot-seal`.
//!
//! ## Key Types
//!
//! - [`Id`] - Random 16-byte identifier shared by every stored object
//! - [`Keypair`] - Ed25519 signing key
//! - [`TrustIndex`] - Name → id directory per [`ResourceClass`], with tag sets
//!   and pairing keys
//!
//! ## Tags
//!
//! Tag input is a comma-separated string. [`normalize_tags`] splits it, trims
//! every element and lower-cases it. The index stores tags as sets.

pub mod codec;
pub mod crypto;
pub mod error;
pub mod index;
pub mod tags;
pub mod types;

pub use codec::{from_cbor, to_cbor};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CoreError, Result};
pub use index::{PairingKeyEntry, PairingPurpose, ResourceClass, TrustIndex};
pub use tags::{join_tags, normalize_tags};
pub use types::Id;
