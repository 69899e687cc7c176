//! Per-key fixed-window rate limiting.
//!
//! Keys are route names ("clarityupscaler", "kling", ...). Each key gets a
//! counter that resets when its window expires. State is process-local and
//! lost on restart.

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Counter state for one key.
#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

/// Outcome of a [`RateLimiter::check_limit`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    /// When the current window ends.
    pub reset_at: Instant,
    /// Requests left in the current window.
    pub remaining: u32,
}

impl RateLimitStatus {
    /// Time until the window resets, zero if already past.
    pub fn retry_after(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Serializable view of a live entry, for the admin API.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub key: String,
    pub count: u32,
    pub limit: u32,
    pub reset_in_ms: u64,
}

/// Fixed-window request counter keyed by route.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request against `key` and report whether it fits the budget.
    pub fn check_limit(&self, key: &str) -> RateLimitStatus {
        self.check_limit_at(key, Instant::now())
    }

    fn check_limit_at(&self, key: &str, now: Instant) -> RateLimitStatus {
        let rule = self.config.rule_for(key);
        let window = Duration::from_secs(rule.window_secs);

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                reset_at: now + window,
            });

        // Window expired? Start a fresh one.
        if now >= entry.reset_at || entry.count == 0 {
            *entry = RateLimitEntry {
                count: 1,
                reset_at: now + window,
            };
            return RateLimitStatus {
                allowed: true,
                reset_at: entry.reset_at,
                remaining: rule.max_requests.saturating_sub(1),
            };
        }

        if entry.count >= rule.max_requests {
            metrics::record_rate_limited(key);
            return RateLimitStatus {
                allowed: false,
                reset_at: entry.reset_at,
                remaining: 0,
            };
        }

        entry.count += 1;
        RateLimitStatus {
            allowed: true,
            reset_at: entry.reset_at,
            remaining: rule.max_requests - entry.count,
        }
    }

    /// Drop entries whose window has passed. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    fn cleanup_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.reset_at > now);
        before - self.entries.len()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live entries, sorted by key.
    pub fn snapshot(&self) -> Vec<RateLimitSnapshot> {
        let now = Instant::now();
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.reset_at > now)
            .map(|e| RateLimitSnapshot {
                key: e.key().clone(),
                count: e.count,
                limit: self.config.rule_for(e.key()).max_requests,
                reset_in_ms: e.reset_at.saturating_duration_since(now).as_millis() as u64,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Run [`cleanup`](Self::cleanup) periodically until shutdown.
    pub fn spawn_cleanup(self: std::sync::Arc<Self>, shutdown: &Shutdown) -> JoinHandle<()> {
        let mut shutdown_rx = shutdown.subscribe();
        let period = Duration::from_secs(self.config.cleanup_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.cleanup();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = self.len(), "Rate limit entries swept");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Rate limit cleanup stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitRule;
    use std::sync::Arc;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_secs,
            ..RateLimitConfig::default()
        })
    }

    #[test]
    fn allows_up_to_max_then_blocks() {
        let limiter = limiter(3, 60);
        let now = Instant::now();

        let remaining: Vec<_> = (0..3)
            .map(|_| limiter.check_limit_at("removebg", now))
            .inspect(|s| assert!(s.allowed))
            .map(|s| s.remaining)
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let blocked = limiter.check_limit_at("removebg", now);
        assert!(!blocked.allowed);
        assert_eq!(blocked.remaining, 0);
        assert_eq!(blocked.reset_at, now + Duration::from_secs(60));
    }

    #[test]
    fn window_expiry_starts_fresh_count() {
        let limiter = limiter(1, 10);
        let start = Instant::now();

        assert!(limiter.check_limit_at("kling", start).allowed);
        assert!(!limiter.check_limit_at("kling", start + Duration::from_secs(9)).allowed);

        let later = start + Duration::from_secs(10);
        let status = limiter.check_limit_at("kling", later);
        assert!(status.allowed);
        assert_eq!(status.reset_at, later + Duration::from_secs(10));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(limiter.check_limit_at("a", now).allowed);
        assert!(limiter.check_limit_at("b", now).allowed);
        assert!(!limiter.check_limit_at("a", now).allowed);
    }

    #[test]
    fn overrides_apply_per_key() {
        let mut config = RateLimitConfig {
            max_requests: 1,
            ..RateLimitConfig::default()
        };
        config.overrides.insert(
            "titlerenamer".into(),
            RateLimitRule {
                max_requests: 2,
                window_secs: 60,
            },
        );
        let limiter = RateLimiter::new(config);
        let now = Instant::now();

        assert!(limiter.check_limit_at("titlerenamer", now).allowed);
        assert!(limiter.check_limit_at("titlerenamer", now).allowed);
        assert!(!limiter.check_limit_at("titlerenamer", now).allowed);
        assert!(limiter.check_limit_at("removebg", now).allowed);
        assert!(!limiter.check_limit_at("removebg", now).allowed);
    }

    #[test]
    fn cleanup_removes_only_expired() {
        let limiter = limiter(5, 10);
        let start = Instant::now();

        limiter.check_limit_at("old", start);
        limiter.check_limit_at("new", start + Duration::from_secs(5));

        assert_eq!(limiter.cleanup_at(start + Duration::from_secs(12)), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.snapshot()[0].key, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_task_sweeps_and_stops_on_shutdown() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            window_secs: 1,
            cleanup_interval_secs: 5,
            ..RateLimitConfig::default()
        }));
        let shutdown = Shutdown::new();
        let handle = limiter.clone().spawn_cleanup(&shutdown);

        limiter.check_limit("upscale");
        assert_eq!(limiter.len(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(limiter.is_empty());

        shutdown.trigger();
        handle.await.unwrap();
    }
}
