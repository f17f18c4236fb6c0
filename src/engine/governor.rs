//! Rate governor for per-domain pacing and global concurrency
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-domain minimum delays between requests
//! - Per-domain sliding-window request caps
//! - Integrating robots.txt crawl delays

use crate::config::RateLimitConfig;
use crate::state::DomainPacingState;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

type DomainSlot = Arc<AsyncMutex<DomainPacingState>>;

/// Point-in-time view of the governor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GovernorStats {
    pub domains_tracked: usize,
    pub available_slots: usize,
    pub max_concurrent: usize,
}

/// RateGovernor paces requests per domain and bounds fetches in flight
///
/// The governor coordinates:
/// - Global concurrency limits (max concurrent requests)
/// - Per-domain minimum delay and crawl delay
/// - Per-domain requests-per-second over a one second sliding window
///
/// Each domain's state sits behind its own async mutex. An admission holds
/// that mutex from computing the delay until the request is recorded, so
/// admissions to one domain are serialised while other domains proceed.
/// A concurrency slot is only taken after the pacing wait.
pub struct RateGovernor {
    /// Global semaphore for limiting concurrent fetches
    global_semaphore: Arc<Semaphore>,

    max_concurrent: usize,

    /// Per-domain pacing state, created on first use
    domain_states: Mutex<HashMap<String, DomainSlot>>,

    config: RateLimitConfig,
}

impl RateGovernor {
    /// Creates a new governor
    ///
    /// # Arguments
    ///
    /// * `config` - The rate limit configuration
    pub fn new(config: RateLimitConfig) -> Self {
        let max_concurrent = config.max_concurrent_requests.max(1) as usize;

        Self {
            global_semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            domain_states: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn domain_slot(&self, domain: &str) -> DomainSlot {
        let mut states = self
            .domain_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        states.entry(domain.to_string()).or_default().clone()
    }

    /// Calculates how long a request to `domain` would have to wait now
    ///
    /// Does not record anything. A domain never seen before needs no wait.
    pub async fn compute_delay(&self, domain: &str, declared: Option<Duration>) -> Duration {
        let slot = {
            let states = self
                .domain_states
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match states.get(domain) {
                Some(slot) => Arc::clone(slot),
                None => return Duration::ZERO,
            }
        };

        let state = slot.lock().await;
        state.compute_delay(&self.config, declared, Instant::now())
    }

    /// Waits until a request to `domain` is permitted, then records it
    ///
    /// The pacing wait happens before a concurrency slot is taken, so a
    /// domain waiting on its own delay never holds a slot other domains
    /// could use. The request is recorded once the slot is held.
    ///
    /// # Arguments
    ///
    /// * `domain` - The domain key of the request
    /// * `declared` - The site's crawl delay, if it is being honored
    ///
    /// # Returns
    ///
    /// * `Some((permit, waited))` - The slot to hold for the fetch and how long pacing held the caller back
    /// * `None` - The semaphore was closed
    pub async fn admit(
        &self,
        domain: &str,
        declared: Option<Duration>,
    ) -> Option<(OwnedSemaphorePermit, Duration)> {
        let slot = self.domain_slot(domain);
        let mut state = slot.lock().await;

        let delay = state.compute_delay(&self.config, declared, Instant::now());
        if !delay.is_zero() {
            tracing::debug!("Pacing {}: waiting {:?}", domain, delay);
            tokio::time::sleep(delay).await;
        }

        // The delay only shrinks while waiting, so no recompute is needed
        let permit = self.acquire_slot().await?;
        state.record_request(&self.config, Instant::now());
        tracing::trace!(
            "Admitted request #{} to {}",
            state.request_count,
            domain
        );

        Some((permit, delay))
    }

    /// Acquires one of the global concurrency slots
    ///
    /// The slot is returned when the permit is dropped, including when the
    /// owning future is cancelled.
    ///
    /// # Returns
    ///
    /// * `Some(permit)` - A slot is held
    /// * `None` - The semaphore was closed
    pub async fn acquire_slot(&self) -> Option<OwnedSemaphorePermit> {
        self.global_semaphore.clone().acquire_owned().await.ok()
    }

    /// Number of concurrency slots currently free
    pub fn available_slots(&self) -> usize {
        self.global_semaphore.available_permits()
    }

    /// Number of domains with pacing state
    pub fn domains_tracked(&self) -> usize {
        self.domain_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Gets a copy of the pacing state for a specific domain
    pub async fn domain_state(&self, domain: &str) -> Option<DomainPacingState> {
        let slot = self
            .domain_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain)
            .cloned()?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    pub fn stats(&self) -> GovernorStats {
        GovernorStats {
            domains_tracked: self.domains_tracked(),
            available_slots: self.available_slots(),
            max_concurrent: self.max_concurrent,
        }
    }
}
