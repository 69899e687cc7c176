//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and URLs.
//! All problems are collected so a bad config reports everything at once.

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{GatewayConfig, QueueConfig, RateLimitRule};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "must be a socket address like 0.0.0.0:3000",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be > 0"));
    }

    let limits = &config.rate_limit;
    check_rule(
        "rate_limit",
        &RateLimitRule {
            max_requests: limits.max_requests,
            window_secs: limits.window_secs,
        },
        &mut errors,
    );
    if limits.cleanup_interval_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.cleanup_interval_secs",
            "must be > 0",
        ));
    }
    for (key, rule) in &limits.overrides {
        check_rule(&format!("rate_limit.overrides.{key}"), rule, &mut errors);
    }

    check_queue("queues.fal", &config.queues.fal, &mut errors);
    check_queue("queues.openai", &config.queues.openai, &mut errors);
    check_queue("queues.anthropic", &config.queues.anthropic, &mut errors);

    let providers = &config.providers;
    check_url("providers.fal.base_url", &providers.fal.base_url, &mut errors);
    check_url("providers.fal.queue_url", &providers.fal.queue_url, &mut errors);
    check_url("providers.openai.base_url", &providers.openai.base_url, &mut errors);
    check_url(
        "providers.anthropic.base_url",
        &providers.anthropic.base_url,
        &mut errors,
    );
    if providers.fal.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "providers.fal.poll_interval_ms",
            "must be > 0",
        ));
    }
    if config.timeouts.request_secs > 0
        && config.timeouts.request_secs <= providers.fal.poll_timeout_secs
    {
        errors.push(ValidationError::new(
            "providers.fal.poll_timeout_secs",
            "must be less than timeouts.request_secs",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new(
            "admin.api_key",
            "must not be empty when admin is enabled",
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be > 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_rule(prefix: &str, rule: &RateLimitRule, errors: &mut Vec<ValidationError>) {
    if rule.max_requests == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.max_requests"),
            "must be > 0",
        ));
    }
    if rule.window_secs == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.window_secs"),
            "must be > 0",
        ));
    }
}

fn check_queue(prefix: &str, queue: &QueueConfig, errors: &mut Vec<ValidationError>) {
    if queue.concurrent_limit == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.concurrent_limit"),
            "must be > 0",
        ));
    }
    if queue.base_delay_ms > queue.max_delay_ms {
        errors.push(ValidationError::new(
            format!("{prefix}.base_delay_ms"),
            "must not exceed max_delay_ms",
        ));
    }
    if queue.timeout_secs == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.timeout_secs"),
            "must be > 0",
        ));
    }
}

fn check_url(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::new(field, "must be an http(s) URL")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.rate_limit.max_requests = 0;
        config.queues.fal.concurrent_limit = 0;
        config.providers.openai.base_url = "ftp://example.com".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "rate_limit.max_requests",
                "queues.fal.concurrent_limit",
                "providers.openai.base_url",
            ]
        );
    }

    #[test]
    fn rejects_inverted_backoff_bounds() {
        let mut config = GatewayConfig::default();
        config.queues.anthropic.base_delay_ms = 5_000;
        config.queues.anthropic.max_delay_ms = 1_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "queues.anthropic.base_delay_ms");
    }

    #[test]
    fn fal_polling_must_end_before_request_deadline() {
        let mut config = GatewayConfig::default();
        config.timeouts.request_secs = 60;
        config.providers.fal.poll_timeout_secs = 60;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "providers.fal.poll_timeout_secs");

        config.providers.fal.poll_timeout_secs = 59;
        assert!(validate_config(&config).is_ok());
    }
}
