//! Configuration module for Civil-Fetch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use civil_fetch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("civil-fetch.toml")).unwrap();
//! println!("Requests per second: {}", config.rate_limit.requests_per_second);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AgentConfig, AuditConfig, CacheConfig, ComplianceConfig, Config, PolicyConfig,
    PolicyFailureMode, RateLimitConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
