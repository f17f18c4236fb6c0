//! Cached policy records
//!
//! A [`PolicyRecord`] is the unit the policy cache stores per domain. It is
//! replaced wholesale on refresh and treated as absent once past its
//! freshness deadline.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// How a domain's policy was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOrigin {
    /// robots.txt was served with HTTP 200
    Document,
    /// robots.txt does not exist (HTTP 404): no restrictions
    NotFound,
    /// robots.txt could not be retrieved; carries the failure text
    Unavailable(String),
}

/// Cached robots.txt data for a domain
#[derive(Debug, Clone)]
pub struct PolicyRecord {
    /// The parsed robots.txt content
    pub robots: ParsedRobots,

    pub origin: PolicyOrigin,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,

    /// After this instant the record must be re-fetched before use
    pub fresh_until: DateTime<Utc>,
}

impl PolicyRecord {
    /// Creates a record fetched now that stays fresh for `ttl`
    pub fn new(robots: ParsedRobots, origin: PolicyOrigin, ttl: Duration) -> Self {
        let fetched_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let fresh_until = fetched_at
            .checked_add_signed(ttl)
            .unwrap_or(fetched_at + chrono::Duration::days(36_500));

        Self {
            robots,
            origin,
            fetched_at,
            fresh_until,
        }
    }

    /// Creates a permissive record standing in for a failed retrieval
    pub fn unavailable(reason: impl Into<String>, ttl: Duration) -> Self {
        Self::new(
            ParsedRobots::allow_all(),
            PolicyOrigin::Unavailable(reason.into()),
            ttl,
        )
    }

    /// Checks if the record is past its freshness deadline
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now > self.fresh_until
    }

    /// Returns how long ago the robots.txt was fetched
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.origin, PolicyOrigin::Unavailable(_))
    }

    /// The retrieval failure, if this record stands in for one
    pub fn failure(&self) -> Option<&str> {
        match &self.origin {
            PolicyOrigin::Unavailable(reason) => Some(reason),
            _ => None,
        }
    }
}
