use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Civil-Fetch
///
/// Every setting that affects how politely we treat a site is required in the
/// file. Only operational knobs (`policy`, `audit`) may be omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub agent: AgentConfig,
    pub compliance: ComplianceConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Config {
    /// The identity string presented to servers: `Name/Version (+contact)`
    pub fn agent_identity(&self) -> String {
        format!("{} (+{})", self.agent.name, self.agent.contact)
    }

    /// The product token robots.txt groups are matched against
    ///
    /// This is the agent name up to the first `/`, so `OperaBot/1.0` matches
    /// a `User-agent: OperaBot` group.
    pub fn agent_token(&self) -> &str {
        self.agent
            .name
            .split('/')
            .next()
            .unwrap_or(&self.agent.name)
            .trim()
    }
}

/// Agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name (and optional version) of the fetcher, e.g. "OperaResearchBot/1.0"
    pub name: String,

    /// URL or e-mail where site owners can reach the operator
    pub contact: String,
}

/// What to do when a site's robots.txt cannot be retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyFailureMode {
    /// Treat the URL as allowed (fail-open)
    Allow,
    /// Treat the URL as disallowed (fail-closed)
    Deny,
}

/// Switches for each compliance layer
#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceConfig {
    #[serde(rename = "respect-robots-txt")]
    pub respect_robots_txt: bool,

    /// Whether a site's declared Crawl-delay lengthens our own pacing
    #[serde(rename = "honor-crawl-delay")]
    pub honor_crawl_delay: bool,

    #[serde(rename = "enable-rate-limiting")]
    pub enable_rate_limiting: bool,

    #[serde(rename = "enable-caching")]
    pub enable_caching: bool,

    #[serde(rename = "on-policy-error")]
    pub on_policy_error: PolicyFailureMode,
}

/// Pacing and concurrency limits
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum admissions per domain within any one-second window
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,

    /// Minimum time between two requests to the same domain (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Maximum fetches in flight across all domains
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,
}

impl RateLimitConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How long a cached response stays valid (seconds)
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,

    /// Path to the SQLite cache database
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// robots.txt retrieval configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// How long a fetched robots.txt stays fresh (seconds)
    #[serde(rename = "ttl-secs", default = "default_policy_ttl")]
    pub ttl_secs: u64,

    /// Timeout for a single robots.txt request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_policy_timeout")]
    pub request_timeout_secs: u64,
}

impl PolicyConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_policy_ttl(),
            request_timeout_secs: default_policy_timeout(),
        }
    }
}

fn default_policy_ttl() -> u64 {
    24 * 60 * 60
}

fn default_policy_timeout() -> u64 {
    10
}

/// Audit log configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Path of the JSONL audit file; no file is written when absent
    #[serde(rename = "log-path")]
    pub log_path: Option<String>,
}
