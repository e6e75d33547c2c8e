//! # Trustroot Seal
//!
//! Sealed containers and the identity capability.
//!
//! ## Overview
//!
//! Every object that leaves an entity is wrapped in a [`Container`]. There
//! are three ways to seal one:
//!
//! - **Signed**: plaintext body, Ed25519 signature ([`PrivateIdentity::sign`]).
//! - **Signed + encrypted**: body encrypted once under a random content key,
//!   which is wrapped per recipient with X25519 ([`PrivateIdentity::encrypt_then_sign`]).
//! - **Authenticated**: body encrypted under a [`PairingKey`] and MACed with
//!   a key derived from the same secret. Used for first contact, before the
//!   parties know each other's public keys.
//!
//! ## Usage
//!
//! ```rust
//! use trustroot_seal::{Entity, EntityKind, Identity, PrivateIdentity};
//!
//! let org = Entity::generate(EntityKind::Organization, "acme");
//! let alice = Entity::generate(EntityKind::Admin, "alice");
//!
//! let container = org.encrypt_then_sign(b"org secret", &[&alice]).unwrap();
//! let plaintext = alice.open_from(&container, &org.to_public()).unwrap();
//! assert_eq!(plaintext, b"org secret");
//! ```

pub mod container;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod keyshare;
pub mod pairing;

pub use container::{Container, SealMode, SealedBody, KEY_ID, SIGNATURE_ALGORITHM};
pub use crypto::{EncryptionKey, X25519PublicKey, X25519StaticSecret};
pub use error::{Result, SealError};
pub use identity::{Entity, EntityKind, Identity, PrivateIdentity, PublicEntity};
pub use pairing::PairingKey;
