//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use imai_gateway::config::GatewayConfig;
use imai_gateway::GatewayServer;

pub const FAL_KEY: &str = "test-fal-key";
pub const OPENAI_KEY: &str = "test-openai-key";
pub const ANTHROPIC_KEY: &str = "test-anthropic-key";
pub const ADMIN_KEY: &str = "test-admin-key";

/// Config pointing every provider at `upstream`, with fast retries and polling.
pub fn test_config(upstream: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();

    let providers = &mut config.providers;
    providers.fal.api_key = Some(FAL_KEY.into());
    providers.fal.base_url = upstream.to_string();
    providers.fal.queue_url = upstream.to_string();
    providers.fal.poll_interval_ms = 10;
    providers.fal.poll_timeout_secs = 5;
    providers.openai.api_key = Some(OPENAI_KEY.into());
    providers.openai.base_url = upstream.to_string();
    providers.anthropic.api_key = Some(ANTHROPIC_KEY.into());
    providers.anthropic.base_url = upstream.to_string();

    for queue in [
        &mut config.queues.fal,
        &mut config.queues.openai,
        &mut config.queues.anthropic,
    ] {
        queue.base_delay_ms = 10;
        queue.max_delay_ms = 40;
    }

    config.timeouts.upstream_secs = 5;
    config.admin.api_key = ADMIN_KEY.into();
    config
}

pub fn app(config: GatewayConfig) -> Router {
    GatewayServer::new(config).unwrap().router()
}

/// Send one request through `app` and return the status, headers and JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response: Response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, headers, body)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn with_user(mut request: Request<Body>, user: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-user-id", user.parse().unwrap());
    request
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Start an upstream whose answer depends on the call index (from 0) and the
/// JSON request body. Returns its base URL and a call counter.
pub async fn start_programmable_backend<F>(f: F) -> (String, Arc<AtomicU32>)
where
    F: Fn(u32, Value) -> (u16, Value) + Clone + Send + Sync + 'static,
{
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let app = Router::new().fallback(move |body: Bytes| {
        let f = f.clone();
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            let request = serde_json::from_slice(&body).unwrap_or(Value::Null);
            let (status, response) = f(n, request);
            (StatusCode::from_u16(status).unwrap(), Json(response))
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), calls)
}
