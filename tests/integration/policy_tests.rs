//! robots.txt enforcement through the engine

use crate::common::{
    create_test_config, site_with_robots, site_with_robots_status, start_engine, ALLOW_ALL,
};
use civil_fetch::config::PolicyFailureMode;
use civil_fetch::FetchStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetch function that counts its calls
fn counting(calls: &Arc<AtomicUsize>) -> impl FnOnce(String) -> std::future::Ready<Result<String, String>> {
    let calls = Arc::clone(calls);
    move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok("body".to_string()))
    }
}

#[tokio::test]
async fn test_disallowed_url_is_never_fetched() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots("User-agent: *\nDisallow: /private").await;
    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));
    let url = format!("{}/private/report", server.uri());

    for _ in 0..3 {
        let outcome = engine.fetch(&url, counting(&calls)).await;
        assert_eq!(outcome.status, FetchStatus::BlockedByPolicy);
        assert!(outcome.payload.is_none());
        assert_eq!(outcome.reason.as_deref(), Some("disallowed by robots.txt"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Blocking leaves pacing and cache state untouched
    let stats = engine.stats();
    assert_eq!(stats.counters.policy_blocks, 3);
    assert_eq!(stats.governor.domains_tracked, 0);
    assert_eq!(stats.governor.available_slots, stats.governor.max_concurrent);
    assert_eq!(stats.cache.unwrap().total_entries, 0);
}

#[tokio::test]
async fn test_allowed_url_alongside_blocked_one() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots("User-agent: *\nDisallow: /private\nAllow: /private/open").await;
    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));

    let open = engine
        .fetch(&format!("{}/private/open/a", server.uri()), counting(&calls))
        .await;
    let public = engine
        .fetch(&format!("{}/public", server.uri()), counting(&calls))
        .await;

    assert_eq!(open.status, FetchStatus::Fetched);
    assert_eq!(public.status, FetchStatus::Fetched);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_agent_specific_group_applies() {
    let dir = TempDir::new().unwrap();
    let server =
        site_with_robots("User-agent: TestBot\nDisallow: /\n\nUser-agent: *\nAllow: /").await;
    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));

    let outcome = engine
        .fetch(&format!("{}/anything", server.uri()), counting(&calls))
        .await;

    assert_eq!(outcome.status, FetchStatus::BlockedByPolicy);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_robots_fetched_once_per_domain() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ALLOW_ALL))
        .expect(1)
        .mount(&server)
        .await;

    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));
    for i in 0..4 {
        engine
            .fetch(&format!("{}/page/{}", server.uri(), i), counting(&calls))
            .await;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    server.verify().await;
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots_status(404).await;
    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));

    let outcome = engine
        .fetch(&format!("{}/admin", server.uri()), counting(&calls))
        .await;

    assert_eq!(outcome.status, FetchStatus::Fetched);
    assert_eq!(engine.stats().policy_fetch_failures, 0);
}

#[tokio::test]
async fn test_unavailable_robots_fails_open() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots_status(500).await;
    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));

    let outcome = engine
        .fetch(&format!("{}/page", server.uri()), counting(&calls))
        .await;

    assert_eq!(outcome.status, FetchStatus::Fetched);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = engine.stats();
    assert_eq!(stats.policy_fetch_failures, 1);
    assert_eq!(stats.governor.domains_tracked, 1);
}

#[tokio::test]
async fn test_unreachable_robots_fails_open() {
    let dir = TempDir::new().unwrap();
    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));

    // Nothing listens on port 9 of localhost
    let outcome = engine
        .fetch("http://127.0.0.1:9/page", counting(&calls))
        .await;

    assert_eq!(outcome.status, FetchStatus::Fetched);
    assert_eq!(engine.stats().policy_fetch_failures, 1);
}

#[tokio::test]
async fn test_unavailable_robots_fails_closed_when_configured() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots_status(503).await;

    let mut config = create_test_config(&dir);
    config.compliance.on_policy_error = PolicyFailureMode::Deny;
    let engine = start_engine(config);
    let calls = Arc::new(AtomicUsize::new(0));

    let outcome = engine
        .fetch(&format!("{}/page", server.uri()), counting(&calls))
        .await;

    assert_eq!(outcome.status, FetchStatus::BlockedByPolicy);
    assert!(outcome.reason.unwrap().contains("robots.txt unavailable"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.stats().policy_fetch_failures, 1);
}

#[tokio::test]
async fn test_policy_checking_disabled_skips_robots() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&dir);
    config.compliance.respect_robots_txt = false;
    let engine = start_engine(config);
    let calls = Arc::new(AtomicUsize::new(0));

    let outcome = engine
        .fetch(&format!("{}/page", server.uri()), counting(&calls))
        .await;

    assert_eq!(outcome.status, FetchStatus::Fetched);
    server.verify().await;
}
