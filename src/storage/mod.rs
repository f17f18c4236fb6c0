//! Storage module for the durable response cache
//!
//! This module handles all database operations for cached responses:
//! - SQLite database initialization and schema management
//! - Keyed row storage behind the [`Storage`] trait
//! - TTL enforcement and maintenance sweeps in [`ResponseCache`]

mod response_cache;
mod schema;
mod sqlite;
mod traits;

pub use response_cache::{cache_key, CacheStats, ResponseCache};
pub use sqlite::SqliteStorage;
pub use traits::{CacheRow, Storage, StorageError, StorageResult};

use crate::CivilError;

use std::path::Path;

/// Opens (or creates) the cache database at `path`
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CivilError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CivilError> {
    SqliteStorage::new(path)
}
