//! # trustroot
//!
//! Certificate authority and identity lifecycle manager for a small
//! organization. Parties never talk directly: everything moves through an
//! encrypted blob store and per-identity queues.
//!
//! ## Overview
//!
//! - **Organization**: root of trust. Its private document is encrypted for
//!   every admin; its Trust Index is encrypted for itself.
//! - **Admins** join with a one-time pairing key through the `invite`
//!   channel.
//! - **Nodes** register the same way through `registration`, keep a pool of
//!   CSRs on their outbound `csrs` channel and receive signed certificates on
//!   `certs`. A node's private keys never leave it.
//! - **CAs, certificates and CSRs** are stored encrypted under the
//!   organization and indexed by name and tag.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use trustroot::params::{CaCreateParams, OrgCreateParams};
//! use trustroot::store::MemoryStore;
//! use trustroot::{Environment, TrustConfig};
//!
//! async fn example() -> trustroot::Result<()> {
//!     let api = Arc::new(MemoryStore::new());
//!     let home = Arc::new(MemoryStore::new());
//!     let env = Environment::new(api, home, TrustConfig::default());
//!
//!     env.orgs()
//!         .create(OrgCreateParams {
//!             org: "acme".into(),
//!             admin: "alice".into(),
//!         })
//!         .await?;
//!
//!     let ca = env
//!         .cas()
//!         .create(CaCreateParams {
//!             name: "root".into(),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("created CA {}", ca.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `trustroot::core` - identifiers, signing keys, the Trust Index
//! - `trustroot::seal` - containers, pairing keys, entities
//! - `trustroot::store` - store and queue traits, memory and SQLite backends
//! - `trustroot::x509` - CA, certificate and CSR material

pub mod config;
pub mod controllers;
pub mod drain;
pub mod environment;
pub mod error;
pub mod files;
pub mod params;
pub mod resource;

pub use trustroot_core as core;
pub use trustroot_seal as seal;
pub use trustroot_store as store;
pub use trustroot_x509 as x509;

pub use config::{InviteFailurePolicy, LocalConfig, NodeRef, OrgRef, TrustConfig};
pub use drain::{drain, Channel, DrainReport, ItemHandler, ItemOutcome};
pub use environment::{AdminContext, Environment, NodeContext};
pub use error::{Result, TrustError};
pub use resource::Resource;

pub use trustroot_core::{Id, ResourceClass, TrustIndex};
pub use trustroot_seal::{Entity, EntityKind, Identity, PairingKey, PrivateIdentity, PublicEntity};
