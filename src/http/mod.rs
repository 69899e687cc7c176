//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack, graceful shutdown)
//!     → request.rs (request ID, metrics, JSON/multipart bodies, caller identity)
//!     → handlers (validate, rate-limit check, queue provider call)
//!     → response.rs (success envelope) / error.rs (error envelope)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ApiJson, ApiQuery, JsonOrMultipart, UserId, X_REQUEST_ID, X_USER_ID};
pub use response::Success;
pub use server::{AppState, GatewayServer};
