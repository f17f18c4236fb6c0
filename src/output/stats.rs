//! Engine counters and statistics
//!
//! This module provides the running counters every fetch updates and the
//! snapshot the engine reports from them.

use crate::engine::GovernorStats;
use crate::storage::CacheStats;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for one engine instance
///
/// They only ever increase; a new engine starts from zero.
#[derive(Debug, Default)]
pub struct EngineCounters {
    pub total_requests: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub policy_blocks: AtomicU64,
    pub fetched: AtomicU64,
    pub errors: AtomicU64,
    /// Cache reads or writes that failed and were skipped
    pub cache_errors: AtomicU64,
}

impl EngineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            policy_blocks: self.policy_blocks.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`EngineCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub policy_blocks: u64,
    pub fetched: u64,
    pub errors: u64,
    pub cache_errors: u64,
}

impl CounterSnapshot {
    /// Cache hits as a percentage of cache lookups, to two decimals
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            return 0.0;
        }
        let rate = self.cache_hits as f64 / lookups as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

/// Engine statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    #[serde(flatten)]
    pub counters: CounterSnapshot,

    pub cache_hit_rate: f64,

    /// robots.txt retrievals that failed
    pub policy_fetch_failures: u64,

    pub governor: GovernorStats,

    /// `None` when caching is disabled or the cache could not be read
    pub cache: Option<CacheStats>,
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &EngineStats) {
    let c = &stats.counters;

    println!("=== Fetch Statistics ===\n");

    println!("Requests:");
    println!("  Total: {}", c.total_requests);
    println!("  Fetched: {}", c.fetched);
    println!("  Served from cache: {}", c.cache_hits);
    println!("  Blocked by robots.txt: {}", c.policy_blocks);
    println!("  Errors: {}", c.errors);
    println!();

    println!("Cache:");
    println!("  Hits: {} / Misses: {}", c.cache_hits, c.cache_misses);
    println!("  Hit rate: {:.2}%", stats.cache_hit_rate);
    if c.cache_errors > 0 {
        println!("  I/O errors: {}", c.cache_errors);
    }
    if let Some(cache) = &stats.cache {
        println!(
            "  Stored: {} entries, {} bytes (TTL {}s)",
            cache.total_entries, cache.total_size_bytes, cache.ttl_secs
        );
    }
    println!();

    println!("Pacing:");
    println!("  Domains tracked: {}", stats.governor.domains_tracked);
    println!(
        "  Free fetch slots: {} / {}",
        stats.governor.available_slots, stats.governor.max_concurrent
    );
    if stats.policy_fetch_failures > 0 {
        println!(
            "  robots.txt retrieval failures: {}",
            stats.policy_fetch_failures
        );
    }
}
