//! In-memory implementation of the store and queues.
//!
//! Same semantics as SQLite without persistence. Used by tests and by
//! callers that want a throwaway backend.

use std::collections::{HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use trustroot_core::Id;

use crate::error::{Result, StoreError};
use crate::traits::{Direction, Queue, Store, Visibility};

/// In-memory backend. All data is lost when dropped.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Documents keyed by (visibility, owner, item).
    documents: HashMap<(Visibility, Id, Id), Vec<u8>>,

    /// Channels keyed by (direction, owner, channel).
    queues: HashMap<(Direction, Id, String), VecDeque<Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn get(&self, visibility: Visibility, owner: &Id, item: &Id) -> Result<Vec<u8>> {
        self.read()?
            .documents
            .get(&(visibility, *owner, *item))
            .cloned()
            .ok_or_else(|| not_found(visibility, owner, item))
    }

    fn put(&self, visibility: Visibility, owner: &Id, item: &Id, data: &[u8]) -> Result<()> {
        self.write()?
            .documents
            .insert((visibility, *owner, *item), data.to_vec());
        Ok(())
    }

    fn delete(&self, visibility: Visibility, owner: &Id, item: &Id) -> Result<()> {
        self.write()?
            .documents
            .remove(&(visibility, *owner, *item))
            .map(|_| ())
            .ok_or_else(|| not_found(visibility, owner, item))
    }

    fn push(&self, direction: Direction, owner: &Id, channel: &str, item: &[u8]) -> Result<()> {
        self.write()?
            .queues
            .entry((direction, *owner, channel.to_string()))
            .or_default()
            .push_back(item.to_vec());
        Ok(())
    }

    fn pop(&self, direction: Direction, owner: &Id, channel: &str) -> Result<Vec<u8>> {
        self.write()?
            .queues
            .get_mut(&(direction, *owner, channel.to_string()))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| StoreError::QueueEmpty {
                direction: direction.as_str(),
                owner: owner.to_hex(),
                channel: channel.to_string(),
            })
    }

    fn size(&self, direction: Direction, owner: &Id, channel: &str) -> Result<usize> {
        Ok(self
            .read()?
            .queues
            .get(&(direction, *owner, channel.to_string()))
            .map_or(0, VecDeque::len))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(visibility: Visibility, owner: &Id, item: &Id) -> StoreError {
    StoreError::NotFound {
        visibility: visibility.as_str(),
        owner: owner.to_hex(),
        item: item.to_hex(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_private(&self, owner: &Id, item: &Id) -> Result<Vec<u8>> {
        self.get(Visibility::Private, owner, item)
    }

    async fn send_private(&self, owner: &Id, item: &Id, data: &[u8]) -> Result<()> {
        self.put(Visibility::Private, owner, item, data)
    }

    async fn delete_private(&self, owner: &Id, item: &Id) -> Result<()> {
        self.delete(Visibility::Private, owner, item)
    }

    async fn get_public(&self, owner: &Id, item: &Id) -> Result<Vec<u8>> {
        self.get(Visibility::Public, owner, item)
    }

    async fn send_public(&self, owner: &Id, item: &Id, data: &[u8]) -> Result<()> {
        self.put(Visibility::Public, owner, item, data)
    }

    async fn delete_public(&self, owner: &Id, item: &Id) -> Result<()> {
        self.delete(Visibility::Public, owner, item)
    }
}

#[async_trait]
impl Queue for MemoryStore {
    async fn push_incoming(&self, owner: &Id, channel: &str, item: &[u8]) -> Result<()> {
        self.push(Direction::Incoming, owner, channel, item)
    }

    async fn pop_incoming(&self, owner: &Id, channel: &str) -> Result<Vec<u8>> {
        self.pop(Direction::Incoming, owner, channel)
    }

    async fn incoming_size(&self, owner: &Id, channel: &str) -> Result<usize> {
        self.size(Direction::Incoming, owner, channel)
    }

    async fn push_outgoing(&self, owner: &Id, channel: &str, item: &[u8]) -> Result<()> {
        self.push(Direction::Outgoing, owner, channel, item)
    }

    async fn pop_outgoing(&self, owner: &Id, channel: &str) -> Result<Vec<u8>> {
        self.pop(Direction::Outgoing, owner, channel)
    }

    async fn outgoing_size(&self, owner: &Id, channel: &str) -> Result<usize> {
        self.size(Direction::Outgoing, owner, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_private_and_public_are_separate() {
        let store = MemoryStore::new();
        let owner = Id::generate();
        let item = Id::generate();

        store.send_private(&owner, &item, b"secret").await.unwrap();
        assert_eq!(store.get_private(&owner, &item).await.unwrap(), b"secret");
        assert!(matches!(
            store.get_public(&owner, &item).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_replaces() {
        let store = MemoryStore::new();
        let (owner, item) = (Id::generate(), Id::generate());

        store.send_public(&owner, &item, b"v1").await.unwrap();
        store.send_public(&owner, &item, b"v2").await.unwrap();
        assert_eq!(store.get_public(&owner, &item).await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_delete_private() {
        let store = MemoryStore::new();
        let (owner, item) = (Id::generate(), Id::generate());

        store.send_private(&owner, &item, b"x").await.unwrap();
        store.delete_private(&owner, &item).await.unwrap();
        assert!(store.get_private(&owner, &item).await.is_err());
        assert!(store.delete_private(&owner, &item).await.is_err());
    }

    #[tokio::test]
    async fn test_queue_fifo() {
        let store = MemoryStore::new();
        let owner = Id::generate();

        store.push_incoming(&owner, "invite", b"first").await.unwrap();
        store.push_incoming(&owner, "invite", b"second").await.unwrap();
        assert_eq!(store.incoming_size(&owner, "invite").await.unwrap(), 2);

        assert_eq!(store.pop_incoming(&owner, "invite").await.unwrap(), b"first");
        assert_eq!(store.pop_incoming(&owner, "invite").await.unwrap(), b"second");
        assert_eq!(store.incoming_size(&owner, "invite").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pop_empty_fails() {
        let store = MemoryStore::new();
        let err = store.pop_incoming(&Id::generate(), "certs").await.unwrap_err();
        assert!(matches!(err, StoreError::QueueEmpty { .. }));
    }

    #[tokio::test]
    async fn test_directions_and_channels_are_separate() {
        let store = MemoryStore::new();
        let owner = Id::generate();

        store.push_outgoing(&owner, "csrs", b"csr").await.unwrap();
        assert_eq!(store.outgoing_size(&owner, "csrs").await.unwrap(), 1);
        assert_eq!(store.incoming_size(&owner, "csrs").await.unwrap(), 0);
        assert_eq!(store.outgoing_size(&owner, "certs").await.unwrap(), 0);
        assert_eq!(store.outgoing_size(&Id::generate(), "csrs").await.unwrap(), 0);

        assert_eq!(store.pop_outgoing(&owner, "csrs").await.unwrap(), b"csr");
    }

    proptest! {
        #[test]
        fn prop_channel_preserves_order(
            items in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..8), 0..16)
        ) {
            let store = MemoryStore::new();
            let owner = Id::generate();
            for item in &items {
                store.push(Direction::Outgoing, &owner, "csrs", item).unwrap();
            }
            prop_assert_eq!(store.size(Direction::Outgoing, &owner, "csrs").unwrap(), items.len());

            let mut popped = Vec::new();
            while store.size(Direction::Outgoing, &owner, "csrs").unwrap() > 0 {
                popped.push(store.pop(Direction::Outgoing, &owner, "csrs").unwrap());
            }
            prop_assert_eq!(popped, items);
        }
    }
}
