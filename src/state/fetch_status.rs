/// Terminal outcome tags for a fetch decision
///
/// Every call into the engine ends in exactly one of these.
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a single fetch request was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Payload came from the response cache; no network call, no pacing
    ServedFromCache,

    /// Payload was retrieved by the caller's fetch function
    Fetched,

    /// The site's robots.txt forbids the URL; no network call was made
    BlockedByPolicy,

    /// The URL was invalid or the fetch function failed
    Error,
}

impl FetchStatus {
    /// Returns true if the outcome carries a payload
    pub fn is_success(&self) -> bool {
        matches!(self, Self::ServedFromCache | Self::Fetched)
    }

    /// Returns true if a network fetch was attempted
    pub fn hit_network(&self) -> bool {
        matches!(self, Self::Fetched | Self::Error)
    }

    /// Tag used in audit records and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServedFromCache => "served_from_cache",
            Self::Fetched => "fetched",
            Self::BlockedByPolicy => "blocked_by_policy",
            Self::Error => "error",
        }
    }

    /// Parses a tag produced by [`FetchStatus::as_str`]
    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "served_from_cache" => Some(Self::ServedFromCache),
            "fetched" => Some(Self::Fetched),
            "blocked_by_policy" => Some(Self::BlockedByPolicy),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn all() -> [Self; 4] {
        [
            Self::ServedFromCache,
            Self::Fetched,
            Self::BlockedByPolicy,
            Self::Error,
        ]
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
