//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::QueueConfig;

/// Exponential delay `base * 2^(attempt - 1)`, capped at `max_ms`, plus up to
/// 10% jitter. Attempt 0 means "no retry yet" and yields zero.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

/// Backoff schedule for one queue.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.base_delay_ms, config.max_delay_ms)
    }

    /// Delay before retry number `attempt`, never shorter than `previous`.
    ///
    /// Jitter alone could otherwise make a capped delay shrink between
    /// consecutive retries of the same job.
    pub fn next_delay(&self, attempt: u32, previous: Duration) -> Duration {
        calculate_backoff(attempt, self.base_ms, self.max_ms).max(previous)
    }
}
