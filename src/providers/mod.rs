//! Upstream AI provider clients.
//!
//! # Data Flow
//! ```text
//! handler
//!     → RequestQueue (per provider)
//!     → fal.rs / openai.rs / anthropic.rs (build request, authenticate)
//!     → http.rs (send, check status, decode JSON, record metrics)
//! ```
//!
//! Kling video models are hosted on FAL, so Kling calls go through [`FalClient`].

pub mod anthropic;
pub mod error;
pub mod fal;
pub mod http;
pub mod openai;

use std::time::Duration;

pub use anthropic::AnthropicClient;
pub use error::UpstreamError;
pub use fal::FalClient;
pub use openai::OpenAiClient;

use crate::config::ProvidersConfig;

/// All provider clients, sharing one connection pool.
#[derive(Clone)]
pub struct Providers {
    pub fal: FalClient,
    pub openai: OpenAiClient,
    pub anthropic: AnthropicClient,
}

impl Providers {
    pub fn new(config: &ProvidersConfig, upstream_timeout: Duration) -> Result<Self, UpstreamError> {
        let client = http::build_client(upstream_timeout)?;
        Ok(Self {
            fal: FalClient::new(client.clone(), config.fal.clone()),
            openai: OpenAiClient::new(client.clone(), config.openai.clone()),
            anthropic: AnthropicClient::new(client, config.anthropic.clone()),
        })
    }
}
