//! State module for tracking fetch pacing and outcomes
//!
//! # Components
//!
//! - `DomainPacingState`: Per-domain timing used by the rate governor
//! - `FetchStatus`: The terminal outcome of a single fetch request

mod domain_state;
mod fetch_status;

// Re-export main types
pub use domain_state::{window_capacity, DomainPacingState, RATE_WINDOW};
pub use fetch_status::FetchStatus;
