//! Upstream provider failures.

use crate::resilience::classify::is_rate_limit_message;

/// A failed call to an AI provider.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} did not finish within {waited_secs}s")]
    Timeout {
        provider: &'static str,
        waited_secs: u64,
    },
    #[error("{provider} API key is not configured")]
    MissingCredentials { provider: &'static str },
    #[error("{provider} job failed: {message}")]
    Failed {
        provider: &'static str,
        message: String,
    },
}

impl UpstreamError {
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Transport { provider, .. }
            | Self::Status { provider, .. }
            | Self::Decode { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::MissingCredentials { provider }
            | Self::Failed { provider, .. } => provider,
        }
    }

    /// HTTP status the provider answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// HTTP 429, or a message carrying a rate-limit signature.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::MissingCredentials { .. } | Self::Timeout { .. } => false,
            Self::Status { status: 429, .. } => true,
            other => other.status() == Some(429) || is_rate_limit_message(&other.to_string()),
        }
    }
}
