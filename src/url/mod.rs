//! URL handling module for Civil-Fetch
//!
//! This module parses caller-supplied targets and derives the keys the engine
//! tracks state under. URLs are not normalized: `https://a.com/x` and
//! `https://a.com/x/` are different cache entries, and query order matters.

mod domain;

use crate::{UrlError, UrlResult};
use url::Url;

pub use domain::{domain_key, request_path, robots_url};

/// Parses a fetch target and checks it is an http(s) URL with a host
///
/// # Examples
///
/// ```
/// use civil_fetch::url::parse_target;
///
/// assert!(parse_target("https://example.com/a").is_ok());
/// assert!(parse_target("ftp://example.com/a").is_err());
/// assert!(parse_target("not a url").is_err());
/// ```
pub fn parse_target(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
