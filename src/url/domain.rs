use url::Url;

/// Extracts the pacing/policy key for a URL
///
/// This is the lowercase host, followed by `:port` when the URL carries a
/// non-default port, so two services on one host are paced separately.
/// Returns None if the URL has no host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use civil_fetch::url::domain_key;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(domain_key(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(domain_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn domain_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Builds the robots.txt URL for the site serving `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    url.host_str()?;
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    // Credentials never belong in a policy request
    let _ = robots.set_username("");
    let _ = robots.set_password(None);
    Some(robots)
}

/// Returns the path plus query that robots.txt rules are matched against
pub fn request_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
