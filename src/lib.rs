//! IMAI.studio API gateway library.
//!
//! Thin HTTP routes in front of FAL, OpenAI and Anthropic, with a per-key
//! rate limiter and per-provider request queues that cap concurrency and
//! retry rate-limited calls with exponential backoff.

pub mod admin;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod providers;
pub mod resilience;
pub mod security;
pub mod store;

pub use config::schema::GatewayConfig;
pub use error::{ApiError, ApiResult};
pub use http::{AppState, GatewayServer};
pub use lifecycle::Shutdown;
pub use resilience::{QueueRegistry, RequestQueue};
pub use security::RateLimiter;
