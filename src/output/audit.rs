//! Append-only JSONL audit log
//!
//! One line per fetch decision. Lines are written whole under a mutex, so
//! concurrent fetches never interleave within a record.

use crate::state::FetchStatus;
use crate::CivilError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A single audit log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub status: FetchStatus,
    pub user_agent: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Whether the payload was (or will be) served from cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,

    /// Why the request was blocked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Time spent waiting on pacing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waited_ms: Option<u64>,

    /// Total time the decision took
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

impl AuditRecord {
    /// Creates a record stamped with the current time
    pub fn new(url: impl Into<String>, status: FetchStatus, user_agent: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            url: url.into(),
            status,
            user_agent: user_agent.into(),
            domain: None,
            cached: None,
            reason: None,
            error: None,
            waited_ms: None,
            elapsed_ms: None,
        }
    }
}

/// Writes audit records to a file, or nowhere when no path is configured
pub struct AuditLog {
    path: Option<PathBuf>,
    file: Option<Mutex<File>>,
}

impl AuditLog {
    /// Opens `path` for appending, creating it and its parent directories
    pub fn open(path: &Path) -> Result<Self, CivilError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            file: Some(Mutex::new(file)),
        })
    }

    /// An audit log that discards every record
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Appends one record as a JSON line
    pub fn record(&self, record: &AuditRecord) -> Result<(), CivilError> {
        let Some(file) = &self.file else {
            return Ok(());
        };

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&line)?;
        Ok(())
    }
}

/// Reads every record back from a JSONL audit file
pub fn read_audit_log(path: &Path) -> Result<Vec<AuditRecord>, CivilError> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(CivilError::from))
        .collect()
}
