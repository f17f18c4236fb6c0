//! Robots.txt handling module
//!
//! This module fetches, parses, and caches each site's robots.txt and answers
//! whether a URL may be fetched and how slowly. Records are kept per domain
//! and refreshed only when absent or stale.

mod cache;
mod parser;
mod policy_cache;
mod source;

pub use cache::{PolicyOrigin, PolicyRecord};
pub use parser::{AgentGroup, ParsedRobots, PathRule, RequestRate, RuleKind};
pub use policy_cache::{PolicyCache, PolicyDecision};
pub use source::{HttpPolicySource, PolicyDocument, PolicyFetchError, PolicySource};

use crate::url::robots_url;
use std::time::Duration;
use url::Url;

/// Upper bound on how long a failed retrieval is remembered
///
/// Keeps a dead host from being asked on every request while letting it
/// recover well before a full policy TTL.
pub const FAILED_POLICY_TTL: Duration = Duration::from_secs(5 * 60);

/// Fetches robots.txt for the site serving `url`
///
/// # Arguments
///
/// * `source` - Where to fetch the document from
/// * `url` - Any URL on the site
/// * `ttl` - How long a successful result stays fresh
///
/// # Returns
///
/// A fresh [`PolicyRecord`]. Retrieval failures produce an
/// [`PolicyOrigin::Unavailable`] record rather than an error.
pub async fn fetch_robots(source: &dyn PolicySource, url: &Url, ttl: Duration) -> PolicyRecord {
    let Some(robots) = robots_url(url) else {
        return PolicyRecord::unavailable("URL has no host", ttl.min(FAILED_POLICY_TTL));
    };

    match source.fetch_policy(&robots).await {
        Ok(PolicyDocument::Found(body)) => {
            let parsed = ParsedRobots::from_content(&body);
            tracing::info!(
                "Fetched robots.txt from {} ({} agent groups)",
                robots,
                parsed.group_count()
            );
            PolicyRecord::new(parsed, PolicyOrigin::Document, ttl)
        }
        Ok(PolicyDocument::NotFound) => {
            tracing::info!("No robots.txt found at {} (404) - all paths allowed", robots);
            PolicyRecord::new(ParsedRobots::allow_all(), PolicyOrigin::NotFound, ttl)
        }
        Err(e) => {
            tracing::warn!("Could not retrieve robots.txt from {}: {}", robots, e);
            PolicyRecord::unavailable(e.to_string(), ttl.min(FAILED_POLICY_TTL))
        }
    }
}

/// Checks if a URL is allowed by a parsed robots.txt
///
/// # Arguments
///
/// * `robots` - The parsed robots.txt data
/// * `url` - The URL to check
/// * `agent` - The agent product token
pub fn is_allowed(robots: &ParsedRobots, url: &Url, agent: &str) -> bool {
    robots.is_allowed(&crate::url::request_path(url), agent)
}
