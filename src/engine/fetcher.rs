//! HTTP fetch helpers
//!
//! This module handles the requests the engine makes on a caller's behalf:
//! - Building HTTP clients that present the agent identity
//! - GET requests returning the body as text
//! - Error classification by status
//! - Surfacing `X-Robots-Tag` directives

use crate::config::Config;
use crate::CivilError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// The client sends `"{name} (+{contact})"` as its User-Agent on every
/// request, robots.txt included.
///
/// # Arguments
///
/// * `config` - The engine configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.agent_identity())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns its body
///
/// Any non-2xx status is an error so the engine records the fetch as failed.
/// A page whose `X-Robots-Tag` says `noindex` or `nofollow` is still
/// returned, but the directive is logged.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, CivilError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| CivilError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CivilError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    if let Some(directive) = robots_tag_directive(response.headers()) {
        tracing::warn!("{} sent X-Robots-Tag: {}", url, directive);
    }

    response.text().await.map_err(|source| CivilError::Http {
        url: url.to_string(),
        source,
    })
}

/// Returns the `X-Robots-Tag` value if it restricts indexing or following
fn robots_tag_directive(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let value = headers.get("x-robots-tag")?.to_str().ok()?;
    let lowered = value.to_ascii_lowercase();
    (lowered.contains("noindex") || lowered.contains("nofollow")).then(|| value.to_string())
}
