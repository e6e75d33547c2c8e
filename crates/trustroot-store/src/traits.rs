//! Collaborator traits: the document store and the per-identity queues.
//!
//! Both are keyed by owner id. The store holds one document per
//! `(visibility, owner, item)` slot with no versioning; queues are FIFO per
//! `(direction, owner, channel)`.

use async_trait::async_trait;
use std::fmt;
use trustroot_core::Id;

use crate::error::Result;

/// Which half of the store a document lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }
}

/// Queue direction relative to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The document store.
///
/// Private documents are expected to be sealed containers; the store itself
/// does not look inside them.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Private documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a private document. Fails with `NotFound` if absent.
    async fn get_private(&self, owner: &Id, item: &Id) -> Result<Vec<u8>>;

    /// Write a private document, replacing any previous one.
    async fn send_private(&self, owner: &Id, item: &Id, data: &[u8]) -> Result<()>;

    /// Delete a private document. Fails with `NotFound` if absent.
    async fn delete_private(&self, owner: &Id, item: &Id) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Public documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a public document. Fails with `NotFound` if absent.
    async fn get_public(&self, owner: &Id, item: &Id) -> Result<Vec<u8>>;

    /// Write a public document, replacing any previous one.
    async fn send_public(&self, owner: &Id, item: &Id, data: &[u8]) -> Result<()>;

    /// Delete a public document. Fails with `NotFound` if absent.
    async fn delete_public(&self, owner: &Id, item: &Id) -> Result<()>;
}

/// Per-identity inbound/outbound named channels.
///
/// Pop is atomic: two consumers never receive the same item.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Append to the owner's inbound channel.
    async fn push_incoming(&self, owner: &Id, channel: &str, item: &[u8]) -> Result<()>;

    /// Take the oldest inbound item. Fails with `QueueEmpty` if none.
    async fn pop_incoming(&self, owner: &Id, channel: &str) -> Result<Vec<u8>>;

    /// Number of inbound items.
    async fn incoming_size(&self, owner: &Id, channel: &str) -> Result<usize>;

    /// Append to the owner's outbound channel.
    async fn push_outgoing(&self, owner: &Id, channel: &str, item: &[u8]) -> Result<()>;

    /// Take the oldest outbound item. Fails with `QueueEmpty` if none.
    async fn pop_outgoing(&self, owner: &Id, channel: &str) -> Result<Vec<u8>>;

    /// Number of outbound items.
    async fn outgoing_size(&self, owner: &Id, channel: &str) -> Result<usize>;
}

/// A backend offering both the store and the queues.
pub trait Backend: Store + Queue {}

impl<T: Store + Queue + ?Sized> Backend for T {}

/// Extension methods over [`Queue`].
#[async_trait]
pub trait QueueExt: Queue {
    /// Push to either direction.
    async fn push(&self, direction: Direction, owner: &Id, channel: &str, item: &[u8]) -> Result<()> {
        match direction {
            Direction::Incoming => self.push_incoming(owner, channel, item).await,
            Direction::Outgoing => self.push_outgoing(owner, channel, item).await,
        }
    }

    /// Pop from either direction.
    async fn pop(&self, direction: Direction, owner: &Id, channel: &str) -> Result<Vec<u8>> {
        match direction {
            Direction::Incoming => self.pop_incoming(owner, channel).await,
            Direction::Outgoing => self.pop_outgoing(owner, channel).await,
        }
    }

    /// Size of either direction.
    async fn size(&self, direction: Direction, owner: &Id, channel: &str) -> Result<usize> {
        match direction {
            Direction::Incoming => self.incoming_size(owner, channel).await,
            Direction::Outgoing => self.outgoing_size(owner, channel).await,
        }
    }
}

impl<Q: Queue + ?Sized> QueueExt for Q {}
