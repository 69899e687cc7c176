//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl-C / SIGTERM (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → HTTP server stops accepting, drains in-flight requests
//!     → background tasks (rate-limit sweep) observe the signal and exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
