//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build shared state (rate limiter, queues, provider clients, stores)
//! - Create the Axum Router with all API and admin routes
//! - Wire up middleware (request ID, tracing, body limit, deadline, metrics)
//! - Serve until shutdown, then drain

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{DefaultBodyLimit, Request};
use axum::routing::{get, post};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::GatewayConfig;
use crate::handlers;
use crate::http::request::{enforce_deadline, record_metrics, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::providers::{Providers, UpstreamError};
use crate::resilience::QueueRegistry;
use crate::security::RateLimiter;
use crate::store::{InviteRegistry, MediaLibrary};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub limiter: Arc<RateLimiter>,
    pub queues: Arc<QueueRegistry>,
    pub providers: Providers,
    pub library: Arc<MediaLibrary>,
    pub invites: Arc<InviteRegistry>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let providers = Providers::new(
            &config.providers,
            Duration::from_secs(config.timeouts.upstream_secs),
        )?;

        Ok(Self {
            limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            queues: Arc::new(QueueRegistry::new(&config.queues)),
            providers,
            library: Arc::new(MediaLibrary::new()),
            invites: Arc::new(InviteRegistry::new()),
            started_at: Instant::now(),
            config: Arc::new(config),
        })
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    state: AppState,
}

impl GatewayServer {
    /// Create a new server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            state: AppState::new(config)?,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let config = &self.state.config;

        let api = Router::new()
            .route("/api/clarityupscaler", post(handlers::image::clarity_upscale))
            .route("/api/removebg", post(handlers::image::remove_background))
            .route("/api/videoupscaler", post(handlers::video::upscale_video))
            .route("/api/kling", post(handlers::video::kling))
            .route("/api/titlerenamer", post(handlers::text::rename_title))
            .route(
                "/api/library",
                get(handlers::library::list_items)
                    .post(handlers::library::save_item)
                    .delete(handlers::library::delete_item),
            )
            .route("/api/invite", post(handlers::invite::create_invite))
            .route("/api/invite/redeem", post(handlers::invite::redeem_invite))
            .route("/health", get(handlers::health::health))
            .route_layer(middleware::from_fn(record_metrics))
            .with_state(self.state.clone());

        let app = if config.admin.enabled {
            api.merge(admin::setup_admin_router(self.state.clone()))
        } else {
            api
        };

        let deadline = Duration::from_secs(config.timeouts.request_secs);

        let middleware_stack = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size));

        app.layer(middleware::from_fn_with_state(deadline, enforce_deadline))
            .layer(DefaultBodyLimit::disable())
            .layer(middleware_stack)
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.state.config.rate_limit.enabled {
            self.state.limiter.clone().spawn_cleanup(&shutdown);
        }

        let app = self.router();
        let drain = shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
