//! Per-domain robots.txt cache
//!
//! Each domain owns a slot guarded by its own async mutex. The mutex is held
//! while a stale or missing record is refreshed, so concurrent callers for the
//! same domain wait for one retrieval instead of issuing their own.

use crate::config::PolicyFailureMode;
use crate::robots::{fetch_robots, is_allowed, PolicyRecord, PolicySource, RequestRate};
use crate::url::domain_key;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use url::Url;

type RecordSlot = Arc<AsyncMutex<Option<Arc<PolicyRecord>>>>;

/// Everything the coordinator needs to know about one URL
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub crawl_delay: Option<Duration>,
    pub request_rate: Option<RequestRate>,
    /// Why the URL was blocked, when it was
    pub reason: Option<String>,
    /// The site's robots.txt could not be retrieved
    pub policy_unavailable: bool,
}

/// Caches robots.txt per domain with time-bounded freshness
pub struct PolicyCache {
    source: Arc<dyn PolicySource>,
    ttl: Duration,
    failure_mode: PolicyFailureMode,
    slots: Mutex<HashMap<String, RecordSlot>>,
    fetch_failures: AtomicU64,
}

impl PolicyCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `source` - Where robots.txt documents are fetched from
    /// * `ttl` - Freshness window for a fetched document
    /// * `failure_mode` - Whether an unretrievable robots.txt allows or blocks
    pub fn new(source: Arc<dyn PolicySource>, ttl: Duration, failure_mode: PolicyFailureMode) -> Self {
        Self {
            source,
            ttl,
            failure_mode,
            slots: Mutex::new(HashMap::new()),
            fetch_failures: AtomicU64::new(0),
        }
    }

    fn slot(&self, domain: &str) -> RecordSlot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(domain.to_string()).or_default().clone()
    }

    /// Returns the domain's record, refreshing it first if missing or stale
    async fn record_for(&self, url: &Url) -> Arc<PolicyRecord> {
        let Some(domain) = domain_key(url) else {
            return Arc::new(PolicyRecord::unavailable("URL has no host", self.ttl));
        };

        let slot = self.slot(&domain);
        let mut current = slot.lock().await;

        if let Some(record) = current.as_ref() {
            if !record.is_stale() {
                return Arc::clone(record);
            }
            tracing::debug!(
                "robots.txt for {} is stale (age {}s), refreshing",
                domain,
                record.age().num_seconds()
            );
        }

        let record = Arc::new(fetch_robots(self.source.as_ref(), url, self.ttl).await);
        if record.is_unavailable() {
            self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        }
        *current = Some(Arc::clone(&record));
        record
    }

    /// Evaluates `url` for `agent` in one lookup
    pub async fn check(&self, url: &Url, agent: &str) -> PolicyDecision {
        let record = self.record_for(url).await;

        if let Some(failure) = record.failure() {
            let allowed = self.failure_mode == PolicyFailureMode::Allow;
            if allowed {
                tracing::debug!(
                    "robots.txt unavailable for {}, proceeding (fail-open): {}",
                    url,
                    failure
                );
            }
            return PolicyDecision {
                allowed,
                crawl_delay: None,
                request_rate: None,
                reason: (!allowed).then(|| format!("robots.txt unavailable: {}", failure)),
                policy_unavailable: true,
            };
        }

        let allowed = is_allowed(&record.robots, url, agent);
        if !allowed {
            tracing::debug!("robots.txt disallows {} for agent '{}'", url, agent);
        }

        PolicyDecision {
            allowed,
            crawl_delay: record.robots.crawl_delay(agent),
            request_rate: record.robots.request_rate(agent),
            reason: (!allowed).then(|| "disallowed by robots.txt".to_string()),
            policy_unavailable: false,
        }
    }

    /// Checks if `url` may be fetched by `agent`
    pub async fn is_allowed(&self, url: &Url, agent: &str) -> bool {
        self.check(url, agent).await.allowed
    }

    /// The Crawl-delay the site declares for `agent`, if any
    pub async fn crawl_delay(&self, url: &Url, agent: &str) -> Option<Duration> {
        self.check(url, agent).await.crawl_delay
    }

    /// The Request-rate the site declares for `agent`, if any
    pub async fn request_rate(&self, url: &Url, agent: &str) -> Option<RequestRate> {
        self.check(url, agent).await.request_rate
    }

    /// Number of robots.txt retrievals that failed
    pub fn failure_count(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    /// Number of domains with a slot in the cache
    pub fn cached_domains(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drops every cached record
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::info!("Cleared robots.txt cache");
    }
}
