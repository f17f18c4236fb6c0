//! Database schema definitions
//!
//! This module contains the SQL schema for the response cache database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per cached URL, addressed by the SHA-256 of the exact URL string
CREATE TABLE IF NOT EXISTS response_cache (
    key TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    payload TEXT NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_response_cache_stored_at ON response_cache(stored_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
