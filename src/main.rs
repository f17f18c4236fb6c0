//! Civil-Fetch main entry point
//!
//! This is the command-line interface for the compliance-aware fetch engine.

use anyhow::Context;
use civil_fetch::config::{load_config_with_hash, Config};
use civil_fetch::engine::fetch_text;
use civil_fetch::output::print_statistics;
use civil_fetch::FetchEngine;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Civil-Fetch: fetch pages politely
///
/// Every URL is checked against the site's robots.txt, paced per domain,
/// served from a local cache when possible, and recorded in an audit log.
#[derive(Parser, Debug)]
#[command(name = "civil-fetch")]
#[command(version = "1.0.0")]
#[command(about = "A compliance-aware page fetcher", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URLs to fetch
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the settings without fetching
    #[arg(long, conflicts_with_all = ["cache_stats", "clear_cache", "clear_expired"])]
    dry_run: bool,

    /// Show response cache statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "clear_cache", "clear_expired"])]
    cache_stats: bool,

    /// Remove every cached response and exit
    #[arg(long, conflicts_with_all = ["dry_run", "cache_stats", "clear_expired"])]
    clear_cache: bool,

    /// Remove expired cached responses and exit
    #[arg(long, conflicts_with_all = ["dry_run", "cache_stats", "clear_cache"])]
    clear_expired: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let engine = FetchEngine::new(config).context("failed to start fetch engine")?;

    if cli.cache_stats {
        print_statistics(&engine.stats());
    } else if cli.clear_cache {
        let removed = engine.clear_cache()?;
        println!("Removed {} cached responses", removed);
    } else if cli.clear_expired {
        let removed = engine.clear_expired_cache()?;
        println!("Removed {} expired cached responses", removed);
    } else {
        handle_fetch(Arc::new(engine), cli.urls).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("civil_fetch=info,warn"),
            1 => EnvFilter::new("civil_fetch=debug,info"),
            2 => EnvFilter::new("civil_fetch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the settings that would be used
fn handle_dry_run(config: &Config) {
    let compliance = &config.compliance;

    println!("=== Civil-Fetch Dry Run ===\n");

    println!("Agent:");
    println!("  User-Agent: {}", config.agent_identity());
    println!("  robots.txt token: {}", config.agent_token());

    println!("\nCompliance:");
    println!("  Respect robots.txt: {}", compliance.respect_robots_txt);
    println!("  Honor crawl-delay: {}", compliance.honor_crawl_delay);
    println!("  On robots.txt failure: {:?}", compliance.on_policy_error);
    println!("  Rate limiting: {}", compliance.enable_rate_limiting);
    println!("  Caching: {}", compliance.enable_caching);

    println!("\nRate Limits:");
    println!(
        "  Requests per second: {}",
        config.rate_limit.requests_per_second
    );
    println!("  Minimum delay: {}ms", config.rate_limit.min_delay_ms);
    println!(
        "  Max concurrent requests: {}",
        config.rate_limit.max_concurrent_requests
    );

    println!("\nCache:");
    println!("  Database: {}", config.cache.database_path);
    println!("  TTL: {}s", config.cache.ttl_secs);
    println!("  robots.txt TTL: {}s", config.policy.ttl_secs);

    if let Some(path) = &config.audit.log_path {
        println!("\nAudit log: {}", path);
    }

    println!("\n✓ Configuration is valid");
}

/// Fetches every URL concurrently through the engine
async fn handle_fetch(engine: Arc<FetchEngine>, urls: Vec<String>) -> anyhow::Result<()> {
    if urls.is_empty() {
        tracing::warn!("No URLs given, nothing to fetch");
        return Ok(());
    }

    tracing::info!("Fetching {} URLs", urls.len());

    let mut handles = Vec::with_capacity(urls.len());
    for url in urls {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let client = engine.client().clone();
            engine
                .fetch(&url, move |target| async move { fetch_text(&client, &target).await })
                .await
        }));
    }

    for handle in handles {
        let outcome = handle.await.context("fetch task panicked")?;
        let detail = match (&outcome.payload, &outcome.error, &outcome.reason) {
            (Some(body), _, _) => format!("{} bytes", body.len()),
            (_, Some(error), _) => error.clone(),
            (_, _, Some(reason)) => reason.clone(),
            _ => String::new(),
        };
        println!(
            "{:<18} {} ({}ms) {}",
            outcome.status.as_str(),
            outcome.url,
            outcome.elapsed.as_millis(),
            detail
        );
    }

    println!();
    print_statistics(&engine.stats());

    Ok(())
}
