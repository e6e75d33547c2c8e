//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store and queue operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No document at this (owner, item) slot.
    #[error("{visibility} document {item} of {owner} not found")]
    NotFound {
        visibility: &'static str,
        owner: String,
        item: String,
    },

    /// Pop on an empty channel.
    #[error("{direction} channel '{channel}' of {owner} is empty")]
    QueueEmpty {
        direction: &'static str,
        owner: String,
        channel: String,
    },

    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),

    /// Blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the error is a missing document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
