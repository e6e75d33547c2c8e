//! # Trustroot Store
//!
//! Collaborator interfaces for trustroot: a document [`Store`] keyed by
//! `(owner, item)` and per-identity [`Queue`] channels.
//!
//! ## Key Types
//!
//! - [`Store`] - Private and public documents, no versioning
//! - [`Queue`] - Inbound/outbound FIFO channels per owner
//! - [`Backend`] - Anything implementing both
//! - [`SqliteStore`] - SQLite-based persistent backend
//! - [`MemoryStore`] - In-memory backend for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trustroot_core::Id;
//! use trustroot_store::{Queue, SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("trustroot-api.db").unwrap();
//!     let owner = Id::generate();
//!
//!     store.send_private(&owner, &owner, b"sealed document").await.unwrap();
//!     store.push_incoming(&owner, "invite", b"sealed invite").await.unwrap();
//!     assert_eq!(store.incoming_size(&owner, "invite").await.unwrap(), 1);
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Backend, Direction, Queue, QueueExt, Store, Visibility};
