use civil_fetch::config::{
    AgentConfig, AuditConfig, CacheConfig, ComplianceConfig, Config, PolicyConfig,
    PolicyFailureMode, RateLimitConfig,
};
use civil_fetch::FetchEngine;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ALLOW_ALL: &str = "User-agent: *\nAllow: /";

/// Creates a test configuration with short delays and a throwaway database
pub fn create_test_config(dir: &TempDir) -> Config {
    Config {
        agent: AgentConfig {
            name: "TestBot/1.0".to_string(),
            contact: "https://example.com/bot".to_string(),
        },
        compliance: ComplianceConfig {
            respect_robots_txt: true,
            honor_crawl_delay: true,
            enable_rate_limiting: true,
            enable_caching: true,
            on_policy_error: PolicyFailureMode::Allow,
        },
        rate_limit: RateLimitConfig {
            requests_per_second: 100.0,
            min_delay_ms: 0,
            max_concurrent_requests: 10,
        },
        cache: CacheConfig {
            ttl_secs: 3600,
            database_path: dir.path().join("cache.db").to_string_lossy().into_owned(),
        },
        policy: PolicyConfig {
            ttl_secs: 3600,
            request_timeout_secs: 5,
        },
        audit: AuditConfig::default(),
    }
}

pub fn start_engine(config: Config) -> Arc<FetchEngine> {
    Arc::new(FetchEngine::new(config).expect("engine should start"))
}

/// Starts a mock site serving `robots` at /robots.txt
pub async fn site_with_robots(robots: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(robots.to_string()))
        .mount(&server)
        .await;
    server
}

/// Starts a mock site whose robots.txt answers with `status`
pub async fn site_with_robots_status(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

/// Asserts consecutive instants are at least `min_gap_ms` apart
pub fn assert_gaps_at_least(times: &[Instant], min_gap_ms: u64) {
    for pair in times.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= Duration::from_millis(min_gap_ms),
            "gap of {:?} is shorter than {}ms",
            gap,
            min_gap_ms
        );
    }
}
