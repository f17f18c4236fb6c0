//! Response cache behaviour, standalone and through the engine

use crate::common::{create_test_config, site_with_robots, start_engine, ALLOW_ALL};
use civil_fetch::storage::{ResponseCache, SqliteStorage};
use civil_fetch::FetchStatus;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn json_fetcher(
    calls: &Arc<AtomicUsize>,
) -> impl FnOnce(String) -> std::future::Ready<Result<Value, String>> {
    let calls = Arc::clone(calls);
    move |url| {
        calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(json!({ "url": url, "k": "v" })))
    }
}

#[test]
fn test_put_get_and_expiry_on_disk() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("cache.db");

    let cache = ResponseCache::new(SqliteStorage::new(&db).unwrap(), Duration::from_secs(60));
    cache.put("https://example.com/a", &json!({"k": "v"})).unwrap();
    let hit: Option<Value> = cache.get("https://example.com/a").unwrap();
    assert_eq!(hit, Some(json!({"k": "v"})));
    drop(cache);

    // Same file, zero TTL: the entry is now stale
    let cache = ResponseCache::new(SqliteStorage::new(&db).unwrap(), Duration::ZERO);
    std::thread::sleep(Duration::from_millis(5));
    let hit: Option<Value> = cache.get("https://example.com/a").unwrap();
    assert!(hit.is_none());
    assert_eq!(cache.stats().unwrap().total_entries, 0);
}

#[tokio::test]
async fn test_second_fetch_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots(ALLOW_ALL).await;
    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));
    let url = format!("{}/data", server.uri());

    let first = engine.fetch(&url, json_fetcher(&calls)).await;
    let second = engine.fetch(&url, json_fetcher(&calls)).await;

    assert_eq!(first.status, FetchStatus::Fetched);
    assert_eq!(second.status, FetchStatus::ServedFromCache);
    assert_eq!(second.payload, first.payload);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = engine.stats();
    assert_eq!(stats.counters.cache_hits, 1);
    assert_eq!(stats.counters.cache_misses, 1);
    assert_eq!(stats.cache_hit_rate, 50.0);
}

#[tokio::test]
async fn test_cache_hit_skips_policy_and_pacing() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ALLOW_ALL))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&dir);
    config.rate_limit.min_delay_ms = 5_000;
    let engine = start_engine(config);
    let calls = Arc::new(AtomicUsize::new(0));
    let url = format!("{}/data", server.uri());

    engine.fetch(&url, json_fetcher(&calls)).await;
    engine.clear_policy_cache();
    let before = engine.governor().domain_state(&civil_domain(&url)).await.unwrap();

    let start = tokio::time::Instant::now();
    let hit = engine.fetch(&url, json_fetcher(&calls)).await;

    assert_eq!(hit.status, FetchStatus::ServedFromCache);
    assert!(start.elapsed() < Duration::from_secs(1));
    let after = engine.governor().domain_state(&civil_domain(&url)).await.unwrap();
    assert_eq!(after.request_count, before.request_count);
    server.verify().await;
}

fn civil_domain(url: &str) -> String {
    civil_fetch::domain_key(&civil_fetch::parse_target(url).unwrap()).unwrap()
}

#[tokio::test]
async fn test_cache_keys_are_exact_strings() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots(ALLOW_ALL).await;
    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));

    engine
        .fetch(&format!("{}/list?a=1&b=2", server.uri()), json_fetcher(&calls))
        .await;
    let reordered = engine
        .fetch(&format!("{}/list?b=2&a=1", server.uri()), json_fetcher(&calls))
        .await;

    assert_eq!(reordered.status, FetchStatus::Fetched);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_survives_engine_restart() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots(ALLOW_ALL).await;
    let url = format!("{}/persist", server.uri());
    let calls = Arc::new(AtomicUsize::new(0));

    {
        let engine = start_engine(create_test_config(&dir));
        engine.fetch(&url, json_fetcher(&calls)).await;
    }

    let engine = start_engine(create_test_config(&dir));
    let outcome = engine.fetch(&url, json_fetcher(&calls)).await;

    assert_eq!(outcome.status, FetchStatus::ServedFromCache);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_caching_disabled_always_fetches() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots(ALLOW_ALL).await;

    let mut config = create_test_config(&dir);
    config.compliance.enable_caching = false;
    let engine = start_engine(config);
    let calls = Arc::new(AtomicUsize::new(0));
    let url = format!("{}/data", server.uri());

    engine.fetch(&url, json_fetcher(&calls)).await;
    let second = engine.fetch(&url, json_fetcher(&calls)).await;

    assert_eq!(second.status, FetchStatus::Fetched);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(engine.stats().cache.is_none());
    assert_eq!(engine.clear_cache().unwrap(), 0);
    assert!(!dir.path().join("cache.db").exists());
}

#[tokio::test]
async fn test_invalidate_and_clear() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots(ALLOW_ALL).await;
    let engine = start_engine(create_test_config(&dir));
    let calls = Arc::new(AtomicUsize::new(0));
    let a = format!("{}/a", server.uri());
    let b = format!("{}/b", server.uri());

    engine.fetch(&a, json_fetcher(&calls)).await;
    engine.fetch(&b, json_fetcher(&calls)).await;

    assert!(engine.invalidate(&a).unwrap());
    let refetched = engine.fetch(&a, json_fetcher(&calls)).await;
    assert_eq!(refetched.status, FetchStatus::Fetched);

    assert_eq!(engine.clear_expired_cache().unwrap(), 0);
    assert_eq!(engine.clear_cache().unwrap(), 2);
    assert_eq!(engine.stats().cache.unwrap().total_entries, 0);
}
