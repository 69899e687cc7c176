//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-key rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Outbound request queues, one per provider.
    pub queues: QueuesConfig,

    /// Upstream AI provider settings.
    pub providers: ProvidersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for an inbound request, in seconds.
    /// Video routes poll the provider, so this is generous.
    pub request_secs: u64,

    /// Timeout for a single outbound HTTP call, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 300,
            upstream_secs: 120,
        }
    }
}

/// A request budget for one window.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Requests allowed per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limit checks.
    pub enabled: bool,

    /// Reject over-budget requests with 429 instead of logging and proceeding.
    pub enforce: bool,

    /// Default requests allowed per window.
    pub max_requests: u32,

    /// Default window length in seconds.
    pub window_secs: u64,

    /// How often expired entries are swept, in seconds.
    pub cleanup_interval_secs: u64,

    /// Per-key overrides, keyed by route name (e.g. "clarityupscaler").
    pub overrides: HashMap<String, RateLimitRule>,
}

impl RateLimitConfig {
    /// The rule in effect for `key`.
    pub fn rule_for(&self, key: &str) -> RateLimitRule {
        self.overrides.get(key).copied().unwrap_or(RateLimitRule {
            max_requests: self.max_requests,
            window_secs: self.window_secs,
        })
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enforce: false,
            max_requests: 10,
            window_secs: 60,
            cleanup_interval_secs: 60,
            overrides: HashMap::new(),
        }
    }
}

/// Settings for a single outbound request queue.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum jobs executing at once.
    pub concurrent_limit: usize,

    /// Maximum retries for rate-limited jobs.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Jobs older than this when dequeued are rejected, in seconds.
    pub timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 3,
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            timeout_secs: 300,
        }
    }
}

/// Queue settings per provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueuesConfig {
    pub fal: QueueConfig,
    pub openai: QueueConfig,
    pub anthropic: QueueConfig,
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            fal: QueueConfig::default(),
            openai: QueueConfig {
                concurrent_limit: 5,
                ..QueueConfig::default()
            },
            anthropic: QueueConfig {
                concurrent_limit: 5,
                ..QueueConfig::default()
            },
        }
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub fal: FalConfig,
    pub openai: OpenAiConfig,
    pub anthropic: AnthropicConfig,
}

/// FAL AI settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FalConfig {
    /// API key; falls back to the `FAL_KEY` environment variable.
    pub api_key: Option<String>,

    /// Synchronous inference endpoint.
    pub base_url: String,

    /// Queue endpoint used for long-running jobs.
    pub queue_url: String,

    /// Status polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Give up polling a queued job after this many seconds.
    pub poll_timeout_secs: u64,
}

impl Default for FalConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://fal.run".to_string(),
            queue_url: "https://queue.fal.run".to_string(),
            poll_interval_ms: 2000,
            poll_timeout_secs: 280,
        }
    }
}

/// OpenAI settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key; falls back to the `OPENAI_API_KEY` environment variable.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Anthropic settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// API key; falls back to the `ANTHROPIC_API_KEY` environment variable.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            max_tokens: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes (multipart image uploads included).
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 20 * 1024 * 1024, // 20MB
        }
    }
}
