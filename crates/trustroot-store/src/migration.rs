//! SQLite schema, versioned through `PRAGMA user_version`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Schema steps in order; step `i` takes the database to version `i + 1`.
const STEPS: &[&str] = &[
    // 1: documents, addressed by (visibility, owner entity, item id).
    "CREATE TABLE documents (
        visibility TEXT NOT NULL,
        owner BLOB NOT NULL,
        item BLOB NOT NULL,
        data BLOB NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (visibility, owner, item)
    );",
    // 2: per-entity channels, popped in `seq` order.
    "CREATE TABLE queue_items (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        direction TEXT NOT NULL,
        owner BLOB NOT NULL,
        channel TEXT NOT NULL,
        data BLOB NOT NULL,
        enqueued_at INTEGER NOT NULL
    );
    CREATE INDEX idx_queue_items_channel ON queue_items(direction, owner, channel, seq);",
];

pub const CURRENT_VERSION: u32 = STEPS.len() as u32;

/// Bring `conn` up to `CURRENT_VERSION`. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let found: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if found > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{found} is newer than supported v{CURRENT_VERSION}"
        )));
    }

    let tx = conn.transaction()?;
    for (version, step) in (1..).zip(STEPS).skip(found as usize) {
        tx.execute_batch(step)?;
        tx.pragma_update(None, "user_version", version)?;
        tracing::debug!(version, "applied schema step");
    }
    tx.commit()?;
    Ok(())
}

/// Unix time in milliseconds; 0 if the clock is before the epoch.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(conn: &Connection) -> u32 {
        conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_fresh_database_reaches_current() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(version(&conn), CURRENT_VERSION);

        let count: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('documents', 'queue_items')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_reopen_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(version(&conn), CURRENT_VERSION);
    }

    #[test]
    fn test_partial_database_is_upgraded() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(STEPS[0]).unwrap();
        conn.pragma_update(None, "user_version", 1u32).unwrap();

        migrate(&mut conn).unwrap();
        assert_eq!(version(&conn), CURRENT_VERSION);
        let queued: i64 = conn
            .query_row("SELECT COUNT(*) FROM queue_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(queued, 0);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", CURRENT_VERSION + 1).unwrap();
        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
