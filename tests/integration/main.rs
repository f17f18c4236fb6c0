//! Integration tests for the fetch engine
//!
//! These tests use wiremock to serve robots.txt and instrumented fetch
//! functions to observe when and how often the network would be hit.

mod cache_tests;
mod common;
mod pacing_tests;
mod policy_tests;
