//! Fetch coordinator - the engine's public entry point
//!
//! Every request runs the same sequence:
//! - Response cache lookup (a hit returns without touching policy or pacing)
//! - robots.txt check (a block returns without a network call)
//! - Per-domain pacing, then a concurrency slot
//! - The caller's fetch function, exactly once
//! - Cache store and audit record

use crate::config::{validate, Config};
use crate::engine::fetcher::build_http_client;
use crate::engine::governor::RateGovernor;
use crate::engine::FetchOutcome;
use crate::output::{AuditLog, AuditRecord, EngineCounters, EngineStats};
use crate::robots::{HttpPolicySource, PolicyCache, PolicySource};
use crate::state::FetchStatus;
use crate::storage::{ResponseCache, SqliteStorage};
use crate::url::{domain_key, parse_target};
use crate::CivilError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Compliance-aware fetch engine
///
/// Share it between tasks with an `Arc`; every method takes `&self`.
pub struct FetchEngine {
    config: Arc<Config>,
    client: Client,
    policy: PolicyCache,
    governor: RateGovernor,
    cache: Option<ResponseCache>,
    audit: AuditLog,
    counters: EngineCounters,
    user_agent: String,
    agent_token: String,
}

impl FetchEngine {
    /// Creates an engine from a configuration
    ///
    /// Opens the cache database and the audit log named in the
    /// configuration and fetches robots.txt over HTTP.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchEngine)` - Ready to fetch
    /// * `Err(CivilError)` - Invalid configuration or unusable cache/audit path
    pub fn new(config: Config) -> Result<Self, CivilError> {
        validate(&config)?;

        let client = build_http_client(&config)?;
        let source = Arc::new(HttpPolicySource::new(
            client.clone(),
            config.policy.request_timeout(),
        ));

        let storage = if config.compliance.enable_caching {
            Some(SqliteStorage::new(Path::new(&config.cache.database_path))?)
        } else {
            None
        };

        let audit = match &config.audit.log_path {
            Some(path) => AuditLog::open(Path::new(path))?,
            None => AuditLog::disabled(),
        };

        Ok(Self::assemble(config, client, source, storage, audit))
    }

    /// Creates an engine from explicit parts
    ///
    /// # Arguments
    ///
    /// * `config` - The engine configuration
    /// * `source` - Where robots.txt comes from
    /// * `storage` - Cache backend; an in-memory database is used if caching
    ///   is enabled and none is given
    /// * `audit` - Audit log destination
    pub fn with_components(
        config: Config,
        source: Arc<dyn PolicySource>,
        storage: Option<SqliteStorage>,
        audit: AuditLog,
    ) -> Result<Self, CivilError> {
        validate(&config)?;

        let client = build_http_client(&config)?;
        let storage = match storage {
            Some(storage) => Some(storage),
            None if config.compliance.enable_caching => Some(SqliteStorage::new_in_memory()?),
            None => None,
        };

        Ok(Self::assemble(config, client, source, storage, audit))
    }

    fn assemble(
        config: Config,
        client: Client,
        source: Arc<dyn PolicySource>,
        storage: Option<SqliteStorage>,
        audit: AuditLog,
    ) -> Self {
        let compliance = &config.compliance;

        let policy = PolicyCache::new(source, config.policy.ttl(), compliance.on_policy_error);
        let governor = RateGovernor::new(config.rate_limit.clone());
        let cache = storage
            .filter(|_| compliance.enable_caching)
            .map(|storage| ResponseCache::new(storage, config.cache.ttl()));

        let user_agent = config.agent_identity();
        let agent_token = config.agent_token().to_string();

        tracing::info!("Fetch engine initialized with user-agent: {}", user_agent);
        tracing::info!("Compliance settings:");
        tracing::info!(
            "  - Respect robots.txt: {} (on failure: {:?})",
            compliance.respect_robots_txt,
            compliance.on_policy_error
        );
        tracing::info!("  - Honor crawl-delay: {}", compliance.honor_crawl_delay);
        tracing::info!(
            "  - Rate limiting: {} ({} req/s, {}ms min delay, {} concurrent)",
            compliance.enable_rate_limiting,
            config.rate_limit.requests_per_second,
            config.rate_limit.min_delay_ms,
            config.rate_limit.max_concurrent_requests
        );
        tracing::info!(
            "  - Caching: {} (TTL: {}s)",
            compliance.enable_caching,
            config.cache.ttl_secs
        );

        if !compliance.respect_robots_txt {
            tracing::warn!("robots.txt checking is DISABLED - this may violate site terms");
        }
        if !compliance.enable_rate_limiting {
            tracing::warn!("Rate limiting is DISABLED - this may overwhelm servers");
        }

        Self {
            config: Arc::new(config),
            client,
            policy,
            governor,
            cache,
            audit,
            counters: EngineCounters::new(),
            user_agent,
            agent_token,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// HTTP client carrying the agent identity, for use in fetch functions
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn policy(&self) -> &PolicyCache {
        &self.policy
    }

    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// Response cache, if caching is enabled
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Fetches `url` through the compliance pipeline
    ///
    /// `fetch_fn` is called at most once, and only after the URL has missed
    /// the cache, passed robots.txt and been paced. Its error is recorded
    /// and returned in the outcome; it is never retried here.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch; the cache is keyed on this exact string
    /// * `fetch_fn` - Performs the network request
    pub async fn fetch<T, F, Fut, E>(&self, url: &str, fetch_fn: F) -> FetchOutcome<T>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        T: Serialize + DeserializeOwned,
    {
        let started = Instant::now();
        EngineCounters::incr(&self.counters.total_requests);

        let target = match parse_target(url) {
            Ok(target) => target,
            Err(e) => {
                EngineCounters::incr(&self.counters.errors);
                tracing::error!("Rejected {}: {}", url, e);
                let outcome = FetchOutcome::failed(url, e.to_string())
                    .with_timing(Duration::ZERO, started.elapsed());
                self.audit_outcome(&outcome, None);
                return outcome;
            }
        };
        let domain = domain_key(&target).unwrap_or_default();

        if let Some(cache) = &self.cache {
            match cache.get::<T>(url) {
                Ok(Some(payload)) => {
                    EngineCounters::incr(&self.counters.cache_hits);
                    tracing::info!("Serving from cache: {}", url);
                    let outcome = FetchOutcome::cached(url, payload)
                        .with_timing(Duration::ZERO, started.elapsed());
                    self.audit_outcome(&outcome, Some(&domain));
                    return outcome;
                }
                Ok(None) => EngineCounters::incr(&self.counters.cache_misses),
                Err(e) => {
                    EngineCounters::incr(&self.counters.cache_errors);
                    EngineCounters::incr(&self.counters.cache_misses);
                    tracing::warn!("Cache read failed for {}, treating as miss: {}", url, e);
                }
            }
        }

        let mut declared_delay = None;
        if self.config.compliance.respect_robots_txt {
            let decision = self.policy.check(&target, &self.agent_token).await;

            if !decision.allowed {
                EngineCounters::incr(&self.counters.policy_blocks);
                tracing::warn!("Blocked by robots.txt: {}", url);
                let reason = decision
                    .reason
                    .unwrap_or_else(|| "disallowed by robots.txt".to_string());
                let outcome = FetchOutcome::blocked(url, reason)
                    .with_timing(Duration::ZERO, started.elapsed());
                self.audit_outcome(&outcome, Some(&domain));
                return outcome;
            }

            if let Some(rate) = decision.request_rate {
                tracing::debug!(
                    "{} declares Request-rate {}/{}s",
                    domain,
                    rate.requests,
                    rate.period.as_secs_f64()
                );
            }
            if self.config.compliance.honor_crawl_delay {
                declared_delay = decision.crawl_delay;
            }
        }

        // Held until the fetch function returns; dropped on every exit path
        let admission = if self.config.compliance.enable_rate_limiting {
            self.governor.admit(&domain, declared_delay).await
        } else {
            self.governor
                .acquire_slot()
                .await
                .map(|permit| (permit, Duration::ZERO))
        };
        let Some((permit, waited)) = admission else {
            EngineCounters::incr(&self.counters.errors);
            let outcome = FetchOutcome::failed(url, "concurrency limiter closed")
                .with_timing(Duration::ZERO, started.elapsed());
            self.audit_outcome(&outcome, Some(&domain));
            return outcome;
        };

        tracing::info!("Fetching: {}", url);
        let result = fetch_fn(url.to_string()).await;
        drop(permit);

        let outcome = match result {
            Ok(payload) => {
                EngineCounters::incr(&self.counters.fetched);
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(url, &payload) {
                        EngineCounters::incr(&self.counters.cache_errors);
                        tracing::warn!("Could not cache {}: {}", url, e);
                    }
                }
                FetchOutcome::fetched(url, payload)
            }
            Err(e) => {
                EngineCounters::incr(&self.counters.errors);
                tracing::error!("Error fetching {}: {}", url, e);
                FetchOutcome::failed(url, e.to_string())
            }
        }
        .with_timing(waited, started.elapsed());

        self.audit_outcome(&outcome, Some(&domain));
        outcome
    }

    fn audit_outcome<T>(&self, outcome: &FetchOutcome<T>, domain: Option<&str>) {
        let mut record = AuditRecord::new(&outcome.url, outcome.status, &self.user_agent);
        record.domain = domain.map(str::to_string);
        record.reason = outcome.reason.clone();
        record.error = outcome.error.clone();
        record.elapsed_ms = Some(outcome.elapsed.as_millis() as u64);

        match outcome.status {
            FetchStatus::ServedFromCache => record.cached = Some(true),
            FetchStatus::Fetched => {
                record.cached = Some(self.cache.is_some());
                record.waited_ms = Some(outcome.waited.as_millis() as u64);
            }
            FetchStatus::Error => record.waited_ms = Some(outcome.waited.as_millis() as u64),
            FetchStatus::BlockedByPolicy => {}
        }

        if let Err(e) = self.audit.record(&record) {
            tracing::error!("Error writing audit record for {}: {}", outcome.url, e);
        }
    }

    /// Counters and component statistics
    pub fn stats(&self) -> EngineStats {
        let counters = self.counters.snapshot();

        let cache = self.cache.as_ref().and_then(|cache| match cache.stats() {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!("Could not read cache statistics: {}", e);
                None
            }
        });

        EngineStats {
            cache_hit_rate: counters.cache_hit_rate(),
            counters,
            policy_fetch_failures: self.policy.failure_count(),
            governor: self.governor.stats(),
            cache,
        }
    }

    /// Removes every cached response
    ///
    /// # Returns
    ///
    /// Number of entries removed; zero when caching is disabled
    pub fn clear_cache(&self) -> Result<u64, CivilError> {
        match &self.cache {
            Some(cache) => Ok(cache.clear_all()?),
            None => Ok(0),
        }
    }

    /// Removes expired and unreadable cached responses
    pub fn clear_expired_cache(&self) -> Result<u64, CivilError> {
        match &self.cache {
            Some(cache) => Ok(cache.clear_expired()?),
            None => Ok(0),
        }
    }

    /// Removes the cached response for `url`
    pub fn invalidate(&self, url: &str) -> Result<bool, CivilError> {
        match &self.cache {
            Some(cache) => Ok(cache.invalidate(url)?),
            None => Ok(false),
        }
    }

    /// Forgets every cached robots.txt
    pub fn clear_policy_cache(&self) {
        self.policy.clear();
    }
}
