//! Storage traits and error types
//!
//! This module defines the trait interface for response cache backends and
//! associated error types.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt cache entry {key}: {reason}")]
    CorruptEntry { key: String, reason: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A raw cache row as the backend stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRow {
    /// Digest of the URL
    pub key: String,
    pub url: String,
    /// JSON-encoded payload
    pub payload: String,
    /// RFC 3339 storage timestamp
    pub stored_at: String,
}

/// Trait for response cache backends
///
/// Backends store rows verbatim. Expiry and decoding are the caller's job,
/// so a backend never needs to understand the payload.
pub trait Storage {
    /// Gets the row stored under `key`
    fn get_entry(&self, key: &str) -> StorageResult<Option<CacheRow>>;

    /// Inserts the row, replacing any row with the same key
    fn put_entry(&mut self, row: &CacheRow) -> StorageResult<()>;

    /// Deletes the row stored under `key`
    ///
    /// # Returns
    ///
    /// `true` if a row was removed
    fn delete_entry(&mut self, key: &str) -> StorageResult<bool>;

    /// Deletes every row, returning how many were removed
    fn clear_entries(&mut self) -> StorageResult<u64>;

    /// Lists `(key, stored_at)` for every row
    fn list_timestamps(&self) -> StorageResult<Vec<(String, String)>>;

    fn count_entries(&self) -> StorageResult<u64>;

    /// Sum of payload lengths in bytes
    fn total_payload_bytes(&self) -> StorageResult<u64>;
}
