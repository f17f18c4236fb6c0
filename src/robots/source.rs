//! Where policy documents come from
//!
//! [`PolicySource`] is the seam between the policy cache and the network so the
//! cache can be exercised without a live site.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Result of asking a site for its robots.txt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDocument {
    /// HTTP 200 with this body
    Found(String),
    /// HTTP 404: the site publishes no policy
    NotFound,
}

/// A robots.txt could not be retrieved
#[derive(Debug, Error)]
pub enum PolicyFetchError {
    #[error("request for {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("{0}")]
    Other(String),
}

/// Fetches policy documents
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Retrieves the document at `robots_url`
    async fn fetch_policy(&self, robots_url: &Url) -> Result<PolicyDocument, PolicyFetchError>;
}

/// Fetches robots.txt over HTTP with the engine's agent identity
#[derive(Debug, Clone)]
pub struct HttpPolicySource {
    client: Client,
    timeout: Duration,
}

impl HttpPolicySource {
    /// # Arguments
    ///
    /// * `client` - HTTP client already carrying the agent's User-Agent header
    /// * `timeout` - Per-request timeout for robots.txt
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl PolicySource for HttpPolicySource {
    async fn fetch_policy(&self, robots_url: &Url) -> Result<PolicyDocument, PolicyFetchError> {
        let response = self
            .client
            .get(robots_url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| PolicyFetchError::Http {
                url: robots_url.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .text()
                    .await
                    .map_err(|source| PolicyFetchError::Http {
                        url: robots_url.to_string(),
                        source,
                    })?;
                Ok(PolicyDocument::Found(body))
            }
            StatusCode::NOT_FOUND => Ok(PolicyDocument::NotFound),
            status => Err(PolicyFetchError::UnexpectedStatus {
                url: robots_url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}
