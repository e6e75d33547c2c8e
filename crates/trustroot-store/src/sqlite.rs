//! SQLite implementation of the store and queues.
//!
//! rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use trustroot_core::Id;

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{Direction, Queue, Store, Visibility};

/// SQLite-backed store.
///
/// Thread-safe via an internal mutex. Pop runs inside a transaction so two
/// consumers never take the same item.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path, creating and migrating it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn get(&self, visibility: Visibility, owner: &Id, item: &Id) -> Result<Vec<u8>> {
        let (owner, item) = (*owner, *item);
        self.run(move |conn| {
            conn.query_row(
                "SELECT data FROM documents WHERE visibility = ?1 AND owner = ?2 AND item = ?3",
                params![visibility.as_str(), owner.as_bytes().as_slice(), item.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| not_found(visibility, &owner, &item))
        })
        .await
    }

    async fn put(&self, visibility: Visibility, owner: &Id, item: &Id, data: &[u8]) -> Result<()> {
        let (owner, item, data) = (*owner, *item, data.to_vec());
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO documents (visibility, owner, item, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (visibility, owner, item)
                 DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![
                    visibility.as_str(),
                    owner.as_bytes().as_slice(),
                    item.as_bytes().as_slice(),
                    data,
                    now_millis(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, visibility: Visibility, owner: &Id, item: &Id) -> Result<()> {
        let (owner, item) = (*owner, *item);
        self.run(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM documents WHERE visibility = ?1 AND owner = ?2 AND item = ?3",
                params![visibility.as_str(), owner.as_bytes().as_slice(), item.as_bytes().as_slice()],
            )?;
            if deleted == 0 {
                return Err(not_found(visibility, &owner, &item));
            }
            Ok(())
        })
        .await
    }

    async fn push(&self, direction: Direction, owner: &Id, channel: &str, item: &[u8]) -> Result<()> {
        let (owner, channel, item) = (*owner, channel.to_string(), item.to_vec());
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO queue_items (direction, owner, channel, data, enqueued_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![direction.as_str(), owner.as_bytes().as_slice(), channel, item, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn pop(&self, direction: Direction, owner: &Id, channel: &str) -> Result<Vec<u8>> {
        let (owner, channel) = (*owner, channel.to_string());
        self.run(move |conn| {
            let tx = conn.transaction()?;

            let head: Option<(i64, Vec<u8>)> = tx
                .query_row(
                    "SELECT seq, data FROM queue_items
                     WHERE direction = ?1 AND owner = ?2 AND channel = ?3
                     ORDER BY seq LIMIT 1",
                    params![direction.as_str(), owner.as_bytes().as_slice(), channel],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((seq, data)) = head else {
                return Err(StoreError::QueueEmpty {
                    direction: direction.as_str(),
                    owner: owner.to_hex(),
                    channel,
                });
            };

            tx.execute("DELETE FROM queue_items WHERE seq = ?1", params![seq])?;
            tx.commit()?;
            Ok(data)
        })
        .await
    }

    async fn size(&self, direction: Direction, owner: &Id, channel: &str) -> Result<usize> {
        let (owner, channel) = (*owner, channel.to_string());
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue_items WHERE direction = ?1 AND owner = ?2 AND channel = ?3",
                params![direction.as_str(), owner.as_bytes().as_slice(), channel],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
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
impl Store for SqliteStore {
    async fn get_private(&self, owner: &Id, item: &Id) -> Result<Vec<u8>> {
        self.get(Visibility::Private, owner, item).await
    }

    async fn send_private(&self, owner: &Id, item: &Id, data: &[u8]) -> Result<()> {
        self.put(Visibility::Private, owner, item, data).await
    }

    async fn delete_private(&self, owner: &Id, item: &Id) -> Result<()> {
        self.delete(Visibility::Private, owner, item).await
    }

    async fn get_public(&self, owner: &Id, item: &Id) -> Result<Vec<u8>> {
        self.get(Visibility::Public, owner, item).await
    }

    async fn send_public(&self, owner: &Id, item: &Id, data: &[u8]) -> Result<()> {
        self.put(Visibility::Public, owner, item, data).await
    }

    async fn delete_public(&self, owner: &Id, item: &Id) -> Result<()> {
        self.delete(Visibility::Public, owner, item).await
    }
}

#[async_trait]
impl Queue for SqliteStore {
    async fn push_incoming(&self, owner: &Id, channel: &str, item: &[u8]) -> Result<()> {
        self.push(Direction::Incoming, owner, channel, item).await
    }

    async fn pop_incoming(&self, owner: &Id, channel: &str) -> Result<Vec<u8>> {
        self.pop(Direction::Incoming, owner, channel).await
    }

    async fn incoming_size(&self, owner: &Id, channel: &str) -> Result<usize> {
        self.size(Direction::Incoming, owner, channel).await
    }

    async fn push_outgoing(&self, owner: &Id, channel: &str, item: &[u8]) -> Result<()> {
        self.push(Direction::Outgoing, owner, channel, item).await
    }

    async fn pop_outgoing(&self, owner: &Id, channel: &str) -> Result<Vec<u8>> {
        self.pop(Direction::Outgoing, owner, channel).await
    }

    async fn outgoing_size(&self, owner: &Id, channel: &str) -> Result<usize> {
        self.size(Direction::Outgoing, owner, channel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_document_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let (owner, item) = (Id::generate(), Id::generate());

        store.send_private(&owner, &item, b"sealed").await.unwrap();
        assert_eq!(store.get_private(&owner, &item).await.unwrap(), b"sealed");

        store.send_private(&owner, &item, b"resealed").await.unwrap();
        assert_eq!(store.get_private(&owner, &item).await.unwrap(), b"resealed");

        assert!(matches!(
            store.get_public(&owner, &item).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteStore::open_memory().unwrap();
        let (owner, item) = (Id::generate(), Id::generate());

        store.send_public(&owner, &item, b"pub").await.unwrap();
        store.delete_public(&owner, &item).await.unwrap();
        assert!(store.get_public(&owner, &item).await.is_err());
        assert!(matches!(
            store.delete_public(&owner, &item).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_queue_fifo_and_empty() {
        let store = SqliteStore::open_memory().unwrap();
        let owner = Id::generate();

        for item in [b"a", b"b", b"c"] {
            store.push_incoming(&owner, "invite", item).await.unwrap();
        }
        store.push_outgoing(&owner, "invite", b"out").await.unwrap();

        assert_eq!(store.incoming_size(&owner, "invite").await.unwrap(), 3);
        assert_eq!(store.pop_incoming(&owner, "invite").await.unwrap(), b"a");
        assert_eq!(store.pop_incoming(&owner, "invite").await.unwrap(), b"b");
        assert_eq!(store.pop_incoming(&owner, "invite").await.unwrap(), b"c");
        assert!(matches!(
            store.pop_incoming(&owner, "invite").await,
            Err(StoreError::QueueEmpty { .. })
        ));

        assert_eq!(store.outgoing_size(&owner, "invite").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.db");
        let (owner, item) = (Id::generate(), Id::generate());

        {
            let store = SqliteStore::open(&path).unwrap();
            store.send_private(&owner, &item, b"kept").await.unwrap();
            store.push_outgoing(&owner, "csrs", b"csr").await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_private(&owner, &item).await.unwrap(), b"kept");
        assert_eq!(store.pop_outgoing(&owner, "csrs").await.unwrap(), b"csr");
    }
}
