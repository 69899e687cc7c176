//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming AI request:
//!     → handlers::admit (route key, e.g. "kling")
//!     → rate_limit.rs (fixed window per key)
//!     → advisory: log and continue, or 429 when `rate_limit.enforce` is set
//! ```
//!
//! Caller identity is asserted upstream via `x-user-id`; see
//! [`crate::http::UserId`].

pub mod rate_limit;

pub use rate_limit::{RateLimitSnapshot, RateLimitStatus, RateLimiter};
