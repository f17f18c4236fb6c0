use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Length of the sliding window the requests-per-second cap is enforced over
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Tracks the pacing of requests to a single domain
///
/// One of these exists per domain for the life of the engine. It is only
/// ever mutated while the domain's lock is held, so the delay computed from it
/// and the request recorded into it always describe the same timeline.
#[derive(Debug, Clone, Default)]
pub struct DomainPacingState {
    /// Number of requests admitted to this domain
    pub request_count: u64,

    /// Timestamp of the last admitted request
    pub last_request_time: Option<Instant>,

    /// Admission timestamps inside the current window, oldest first
    pub recent: VecDeque<Instant>,
}

/// Number of admissions the sliding window may hold
///
/// A fractional rate rounds up; any positive rate allows at least one.
pub fn window_capacity(requests_per_second: f64) -> usize {
    let capacity = (requests_per_second * RATE_WINDOW.as_secs_f64()).ceil();
    if capacity.is_finite() && capacity >= 1.0 {
        capacity.min(usize::MAX as f64) as usize
    } else {
        1
    }
}

impl DomainPacingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates how long to wait before the next request may be made
    ///
    /// The result is the largest of three bounds:
    /// - the configured minimum delay since the last request
    /// - the site's declared crawl delay since the last request
    /// - the time until the sliding window has room for another request
    ///
    /// # Arguments
    ///
    /// * `config` - The rate limit configuration
    /// * `declared` - Crawl delay from robots.txt, if it is being honored
    /// * `now` - The current time instant
    pub fn compute_delay(
        &self,
        config: &RateLimitConfig,
        declared: Option<Duration>,
        now: Instant,
    ) -> Duration {
        let mut delay = Duration::ZERO;

        if let Some(last) = self.last_request_time {
            let elapsed = now.saturating_duration_since(last);
            delay = delay.max(config.min_delay().saturating_sub(elapsed));

            // A zero crawl delay adds nothing
            if let Some(declared) = declared.filter(|d| !d.is_zero()) {
                delay = delay.max(declared.saturating_sub(elapsed));
            }
        }

        delay.max(self.window_wait(window_capacity(config.requests_per_second), now))
    }

    /// Time until the window would accept one more request
    fn window_wait(&self, capacity: usize, now: Instant) -> Duration {
        // Entries are in admission order, so the live ones are a suffix
        let live = self
            .recent
            .iter()
            .rev()
            .take_while(|t| now.saturating_duration_since(**t) < RATE_WINDOW)
            .count();

        if live < capacity {
            return Duration::ZERO;
        }

        // Once this entry ages out the window holds capacity - 1 requests
        let gate = self.recent[self.recent.len() - capacity];
        (gate + RATE_WINDOW).saturating_duration_since(now)
    }

    /// Drops window entries that have aged out
    pub fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.recent.front() {
            if now.saturating_duration_since(*oldest) >= RATE_WINDOW {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records that a request was admitted to this domain
    ///
    /// The last request time never moves backwards and the window never
    /// holds more than `capacity` entries.
    pub fn record_request(&mut self, config: &RateLimitConfig, now: Instant) {
        let capacity = window_capacity(config.requests_per_second);
        let now = match self.last_request_time {
            Some(last) if last > now => last,
            _ => now,
        };

        self.prune(now);
        self.recent.push_back(now);
        while self.recent.len() > capacity {
            self.recent.pop_front();
        }

        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Requests admitted in the window ending at `now`
    pub fn requests_in_window(&self, now: Instant) -> usize {
        self.recent
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < RATE_WINDOW)
            .count()
    }
}
