//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Handler → QueueRegistry.{fal,openai,anthropic}.enqueue(call)
//!     → queue.rs (FIFO wait for a concurrency slot, timeout check at dequeue)
//!     → provider call
//!     → On failure: classify.rs (is this a rate-limit signature?)
//!         yes, retries left → backoff.rs delay → re-queue at the front
//!         otherwise         → reject to the caller
//! ```
//!
//! # Design Decisions
//! - Only rate-limit failures are retried; everything else fails fast
//! - Backoff delays release the concurrency slot while waiting
//! - No active timers: stale jobs are discovered when dequeued

pub mod backoff;
pub mod classify;
pub mod queue;

pub use queue::{QueueError, QueueRegistry, QueueStats, RequestQueue};
