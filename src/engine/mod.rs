//! Engine module for compliant fetching
//!
//! This module contains the request pipeline, including:
//! - Per-domain pacing and global concurrency limits
//! - HTTP client construction and a plain-text fetch helper
//! - The coordinator that runs every request through cache, policy and pacing

mod coordinator;
mod fetcher;
mod governor;
mod outcome;

pub use coordinator::FetchEngine;
pub use fetcher::{build_http_client, fetch_text};
pub use governor::{GovernorStats, RateGovernor};
pub use outcome::FetchOutcome;
