//! Per-domain pacing as seen by the caller's fetch function

use crate::common::{assert_gaps_at_least, create_test_config, site_with_robots, start_engine, ALLOW_ALL};
use civil_fetch::FetchStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

type Timeline = Arc<Mutex<Vec<Instant>>>;

/// Fetch function that records when it was called
fn recorder(
    timeline: &Timeline,
) -> impl FnOnce(String) -> std::future::Ready<Result<String, String>> {
    let timeline = Arc::clone(timeline);
    move |url| {
        timeline.lock().unwrap().push(Instant::now());
        std::future::ready(Ok(url))
    }
}

#[tokio::test]
async fn test_min_delay_between_sequential_fetches() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots(ALLOW_ALL).await;

    let mut config = create_test_config(&dir);
    config.rate_limit.min_delay_ms = 500;
    config.rate_limit.requests_per_second = 2.0;
    let engine = start_engine(config);

    let timeline: Timeline = Arc::default();
    for i in 0..5 {
        let url = format!("{}/page/{}", server.uri(), i);
        let outcome = engine.fetch(&url, recorder(&timeline)).await;
        assert_eq!(outcome.status, FetchStatus::Fetched);
    }

    let times = timeline.lock().unwrap().clone();
    assert_eq!(times.len(), 5);
    assert_gaps_at_least(&times, 500);
}

#[tokio::test]
async fn test_first_fetch_is_not_delayed() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots(ALLOW_ALL).await;

    let mut config = create_test_config(&dir);
    config.rate_limit.min_delay_ms = 5_000;
    let engine = start_engine(config);

    let outcome = engine
        .fetch(&format!("{}/first", server.uri()), |_| async {
            Ok::<_, String>("ok".to_string())
        })
        .await;

    assert_eq!(outcome.status, FetchStatus::Fetched);
    assert_eq!(outcome.waited, Duration::ZERO);
}

#[tokio::test]
async fn test_sliding_window_caps_concurrent_burst() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots(ALLOW_ALL).await;

    let mut config = create_test_config(&dir);
    config.rate_limit.requests_per_second = 3.0;
    config.rate_limit.min_delay_ms = 0;
    let engine = start_engine(config);

    let timeline: Timeline = Arc::default();
    let mut handles = Vec::new();
    for i in 0..7 {
        let engine = Arc::clone(&engine);
        let fetch_fn = recorder(&timeline);
        let url = format!("{}/burst/{}", server.uri(), i);
        handles.push(tokio::spawn(async move { engine.fetch(&url, fetch_fn).await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().status, FetchStatus::Fetched);
    }

    let mut times = timeline.lock().unwrap().clone();
    times.sort();
    assert_eq!(times.len(), 7);

    // Any four consecutive admissions must span at least one window
    for i in 0..times.len() - 3 {
        let span = times[i + 3].duration_since(times[i]);
        assert!(span >= Duration::from_millis(990), "4 requests within {:?}", span);
    }
}

#[tokio::test]
async fn test_declared_crawl_delay_is_honored() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots("User-agent: *\nCrawl-delay: 1\nAllow: /").await;

    let engine = start_engine(create_test_config(&dir));

    let timeline: Timeline = Arc::default();
    for i in 0..2 {
        let url = format!("{}/slow/{}", server.uri(), i);
        engine.fetch(&url, recorder(&timeline)).await;
    }

    let times = timeline.lock().unwrap().clone();
    assert_gaps_at_least(&times, 995);
}

#[tokio::test]
async fn test_crawl_delay_ignored_when_not_honored() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots("User-agent: *\nCrawl-delay: 5\nAllow: /").await;

    let mut config = create_test_config(&dir);
    config.compliance.honor_crawl_delay = false;
    let engine = start_engine(config);

    let start = Instant::now();
    for i in 0..2 {
        let url = format!("{}/fast/{}", server.uri(), i);
        engine
            .fetch(&url, |_| async { Ok::<_, String>(0u32) })
            .await;
    }

    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_rate_limiting_disabled_skips_pacing() {
    let dir = TempDir::new().unwrap();
    let server = site_with_robots(ALLOW_ALL).await;

    let mut config = create_test_config(&dir);
    config.compliance.enable_rate_limiting = false;
    config.rate_limit.min_delay_ms = 5_000;
    let engine = start_engine(config);

    let start = Instant::now();
    for i in 0..3 {
        let url = format!("{}/free/{}", server.uri(), i);
        engine
            .fetch(&url, |_| async { Ok::<_, String>(0u32) })
            .await;
    }

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(engine.governor().domains_tracked(), 0);
}

#[tokio::test]
async fn test_domains_are_paced_independently() {
    let dir = TempDir::new().unwrap();
    let first = site_with_robots(ALLOW_ALL).await;
    let second = site_with_robots(ALLOW_ALL).await;

    let mut config = create_test_config(&dir);
    config.rate_limit.min_delay_ms = 3_000;
    let engine = start_engine(config);

    let noop = |_: String| async { Ok::<_, String>(0u32) };
    engine.fetch(&format!("{}/a", first.uri()), noop).await;

    // A second request to the first site has to wait
    let blocked = {
        let engine = Arc::clone(&engine);
        let url = format!("{}/b", first.uri());
        tokio::spawn(async move { engine.fetch(&url, noop).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let start = Instant::now();
    let outcome = engine.fetch(&format!("{}/a", second.uri()), noop).await;
    assert_eq!(outcome.status, FetchStatus::Fetched);
    assert!(start.elapsed() < Duration::from_secs(1));

    blocked.abort();
}

#[tokio::test]
async fn test_pacing_wait_does_not_stall_other_domains() {
    let dir = TempDir::new().unwrap();
    let slow_site = site_with_robots(ALLOW_ALL).await;
    let fresh_site = site_with_robots(ALLOW_ALL).await;

    let mut config = create_test_config(&dir);
    config.rate_limit.max_concurrent_requests = 1;
    config.rate_limit.min_delay_ms = 1_500;
    let engine = start_engine(config);

    let first = engine
        .fetch(&format!("{}/one", slow_site.uri()), |url| async move {
            Ok::<_, String>(url)
        })
        .await;
    assert_eq!(first.status, FetchStatus::Fetched);

    let paced = {
        let engine = Arc::clone(&engine);
        let url = format!("{}/two", slow_site.uri());
        tokio::spawn(async move {
            engine
                .fetch(&url, |url| async move { Ok::<_, String>(url) })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = Instant::now();
    let other = engine
        .fetch(&format!("{}/first", fresh_site.uri()), |url| async move {
            Ok::<_, String>(url)
        })
        .await;
    assert_eq!(other.status, FetchStatus::Fetched);
    assert_eq!(other.waited, Duration::ZERO);
    assert!(start.elapsed() < Duration::from_millis(1_000));

    let paced = paced.await.unwrap();
    assert_eq!(paced.status, FetchStatus::Fetched);
    assert!(paced.waited >= Duration::from_millis(1_000));
}
