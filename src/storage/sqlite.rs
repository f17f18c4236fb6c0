//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CacheRow, Storage, StorageResult};
use crate::CivilError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CivilError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CivilError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Readers never block the writer under WAL
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database that disappears when dropped
    pub fn new_in_memory() -> Result<Self, CivilError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl Storage for SqliteStorage {
    fn get_entry(&self, key: &str) -> StorageResult<Option<CacheRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT key, url, payload, stored_at FROM response_cache WHERE key = ?1",
                params![key],
                |row| {
                    Ok(CacheRow {
                        key: row.get(0)?,
                        url: row.get(1)?,
                        payload: row.get(2)?,
                        stored_at: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(row)
    }

    fn put_entry(&mut self, row: &CacheRow) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO response_cache (key, url, payload, stored_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![row.key, row.url, row.payload, row.stored_at],
        )?;
        Ok(())
    }

    fn delete_entry(&mut self, key: &str) -> StorageResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM response_cache WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn clear_entries(&mut self) -> StorageResult<u64> {
        let removed = self.conn.execute("DELETE FROM response_cache", [])?;
        Ok(removed as u64)
    }

    fn list_timestamps(&self) -> StorageResult<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, stored_at FROM response_cache")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn count_entries(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM response_cache", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn total_payload_bytes(&self) -> StorageResult<u64> {
        let bytes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(payload AS BLOB))), 0) FROM response_cache",
            [],
            |row| row.get(0),
        )?;
        Ok(bytes as u64)
    }
}
