use crate::config::types::{AgentConfig, CacheConfig, Config, PolicyConfig, RateLimitConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_agent_config(&config.agent)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_cache_config(&config.cache)?;
    validate_policy_config(&config.policy)?;
    Ok(())
}

/// Validates agent identification
fn validate_agent_config(config: &AgentConfig) -> Result<(), ConfigError> {
    let name = config.name.trim();
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "agent name is required and cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
    {
        return Err(ConfigError::Validation(format!(
            "agent name may contain only alphanumerics and '-', '_', '.', '/', got '{}'",
            config.name
        )));
    }

    if name.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "agent name must start with a product token, got '{}'",
            config.name
        )));
    }

    validate_contact(&config.contact)
}

/// Contact must be either an absolute URL or an e-mail address
fn validate_contact(contact: &str) -> Result<(), ConfigError> {
    let contact = contact.trim();
    if contact.is_empty() {
        return Err(ConfigError::Validation(
            "agent contact is required. Provide an e-mail or URL where site owners can reach you"
                .to_string(),
        ));
    }

    if contact.contains('@') && !contact.contains("://") {
        return validate_email(contact);
    }

    let url = Url::parse(contact)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid agent contact: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https" | "mailto") {
        return Err(ConfigError::InvalidUrl(format!(
            "agent contact must be an http(s) or mailto URL, got '{}'",
            contact
        )));
    }

    Ok(())
}

/// Validates pacing limits
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if !config.requests_per_second.is_finite() || config.requests_per_second <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "requests_per_second must be greater than 0, got {}",
            config.requests_per_second
        )));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "cache ttl_secs must be greater than 0".to_string(),
        ));
    }

    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cache database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_policy_config(config: &PolicyConfig) -> Result<(), ConfigError> {
    if config.ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "policy ttl_secs must be greater than 0".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "policy request_timeout_secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
