//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Provider API keys missing from the file are read from the environment.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let mut config: GatewayConfig = toml::from_str(content)?;
    apply_env(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults plus environment keys, for running without a config file.
pub fn default_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    apply_env(&mut config, |key| std::env::var(key).ok());
    config
}

/// Fill unset provider keys using `lookup`.
pub fn apply_env(config: &mut GatewayConfig, lookup: impl Fn(&str) -> Option<String>) {
    let providers = &mut config.providers;
    fill(&mut providers.fal.api_key, lookup("FAL_KEY"));
    fill(&mut providers.openai.api_key, lookup("OPENAI_API_KEY"));
    fill(&mut providers.anthropic.api_key, lookup("ANTHROPIC_API_KEY"));
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.as_deref().map_or(true, str::is_empty) {
        *slot = value.filter(|v| !v.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [rate_limit]
            enforce = true
            max_requests = 5

            [rate_limit.overrides.kling]
            max_requests = 2
            window_secs = 120

            [queues.fal]
            concurrent_limit = 1
            "#,
        )
        .unwrap();

        assert!(config.rate_limit.enforce);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.rule_for("kling").window_secs, 120);
        assert_eq!(config.rate_limit.rule_for("removebg").max_requests, 5);
        assert_eq!(config.queues.fal.concurrent_limit, 1);
        assert_eq!(config.queues.fal.max_retries, 3);
        assert_eq!(config.queues.openai.concurrent_limit, 5);
    }

    #[test]
    fn bundled_config_is_valid() {
        let config = parse_config(include_str!("../../config/gateway.toml")).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.rate_limit.rule_for("kling").max_requests, 3);
        assert_eq!(config.queues.anthropic.concurrent_limit, 5);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = parse_config("[timeouts]\nrequest_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("timeouts.request_secs"));
    }

    #[test]
    fn env_fills_only_missing_keys() {
        let mut config = GatewayConfig::default();
        config.providers.openai.api_key = Some("from-file".into());

        apply_env(&mut config, |key| Some(format!("env-{key}")));

        assert_eq!(config.providers.fal.api_key.as_deref(), Some("env-FAL_KEY"));
        assert_eq!(config.providers.openai.api_key.as_deref(), Some("from-file"));
        assert_eq!(
            config.providers.anthropic.api_key.as_deref(),
            Some("env-ANTHROPIC_API_KEY")
        );
    }
}
