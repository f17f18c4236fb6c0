//! Output module for audit records and statistics
//!
//! This module handles:
//! - Appending one JSON line per fetch decision to the audit log
//! - Counting fetch outcomes for the life of an engine
//! - Printing a statistics summary

mod audit;
pub mod stats;

pub use audit::{read_audit_log, AuditLog, AuditRecord};
pub use stats::{print_statistics, CounterSnapshot, EngineCounters, EngineStats};
