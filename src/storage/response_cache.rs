//! Durable response cache with lazy expiry
//!
//! Entries are addressed by the SHA-256 of the exact URL string. Two URLs
//! that differ only in a trailing slash or query order are different entries.

use crate::storage::traits::{CacheRow, Storage, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Computes the storage key for a URL
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Snapshot of what the cache holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub total_size_bytes: u64,
    pub ttl_secs: u64,
}

/// TTL layer over a [`Storage`] backend
pub struct ResponseCache {
    storage: Mutex<Box<dyn Storage + Send>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(storage: impl Storage + Send + 'static, ttl: Duration) -> Self {
        Self {
            storage: Mutex::new(Box::new(storage)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn with_storage<R>(&self, f: impl FnOnce(&mut dyn Storage) -> R) -> R {
        let mut storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        f(storage.as_mut())
    }

    /// Checks whether an entry stored at `stored_at` has outlived the TTL
    fn is_expired(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - stored_at).to_std() {
            Ok(age) => age > self.ttl,
            // Stored in the future: clock went backwards, keep it
            Err(_) => false,
        }
    }

    /// Gets the cached payload for `url`
    ///
    /// An expired entry, or one whose timestamp cannot be read, is deleted
    /// and reported as absent.
    pub fn get<T: DeserializeOwned>(&self, url: &str) -> StorageResult<Option<T>> {
        let key = cache_key(url);

        self.with_storage(|storage| -> StorageResult<Option<T>> {
            let Some(row) = storage.get_entry(&key)? else {
                return Ok(None);
            };

            let fresh = match DateTime::parse_from_rfc3339(&row.stored_at) {
                Ok(stored_at) => !self.is_expired(stored_at.with_timezone(&Utc), Utc::now()),
                Err(e) => {
                    tracing::warn!("Dropping cache entry for {} with unreadable timestamp: {}", url, e);
                    false
                }
            };

            if !fresh {
                storage.delete_entry(&key)?;
                tracing::debug!("Cache entry for {} expired", url);
                return Ok(None);
            }

            let payload = serde_json::from_str(&row.payload)?;
            Ok(Some(payload))
        })
    }

    /// Stores `payload` for `url`, replacing any previous entry
    pub fn put<T: Serialize + ?Sized>(&self, url: &str, payload: &T) -> StorageResult<()> {
        let row = CacheRow {
            key: cache_key(url),
            url: url.to_string(),
            payload: serde_json::to_string(payload)?,
            stored_at: Utc::now().to_rfc3339(),
        };

        self.with_storage(|storage| storage.put_entry(&row))?;
        tracing::debug!("Cached response for {}", url);
        Ok(())
    }

    /// Removes the entry for `url`
    ///
    /// # Returns
    ///
    /// `true` if an entry was removed
    pub fn invalidate(&self, url: &str) -> StorageResult<bool> {
        let key = cache_key(url);
        self.with_storage(|storage| storage.delete_entry(&key))
    }

    /// Removes every entry, returning how many there were
    pub fn clear_all(&self) -> StorageResult<u64> {
        let removed = self.with_storage(|storage| storage.clear_entries())?;
        tracing::info!("Cleared {} cache entries", removed);
        Ok(removed)
    }

    /// Removes expired entries and entries with unreadable timestamps
    pub fn clear_expired(&self) -> StorageResult<u64> {
        let now = Utc::now();

        let removed = self.with_storage(|storage| -> StorageResult<u64> {
            let mut removed = 0;
            for (key, stored_at) in storage.list_timestamps()? {
                let expired = match DateTime::parse_from_rfc3339(&stored_at) {
                    Ok(stored_at) => self.is_expired(stored_at.with_timezone(&Utc), now),
                    Err(e) => {
                        let corrupt = StorageError::CorruptEntry {
                            key: key.clone(),
                            reason: e.to_string(),
                        };
                        tracing::warn!("{}", corrupt);
                        true
                    }
                };

                if expired && storage.delete_entry(&key)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })?;

        tracing::info!("Removed {} expired cache entries", removed);
        Ok(removed)
    }

    pub fn stats(&self) -> StorageResult<CacheStats> {
        self.with_storage(|storage| -> StorageResult<CacheStats> {
            Ok(CacheStats {
                total_entries: storage.count_entries()?,
                total_size_bytes: storage.total_payload_bytes()?,
                ttl_secs: self.ttl.as_secs(),
            })
        })
    }
}
