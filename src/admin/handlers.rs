use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::{QueueConfig, RateLimitRule};
use crate::http::server::AppState;
use crate::resilience::QueueStats;
use crate::security::RateLimitSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub rate_limit_enforced: bool,
}

#[derive(Serialize)]
pub struct LimitsSummary {
    pub enabled: bool,
    pub enforce: bool,
    pub default_rule: RateLimitRule,
    pub entries: Vec<RateLimitSnapshot>,
}

#[derive(Serialize)]
pub struct QueueSummary {
    pub name: &'static str,
    pub config: QueueConfig,
    pub stats: QueueStats,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        rate_limit_enforced: state.config.rate_limit.enabled && state.config.rate_limit.enforce,
    })
}

pub async fn get_limits(State(state): State<AppState>) -> Json<LimitsSummary> {
    let limits = &state.config.rate_limit;
    Json(LimitsSummary {
        enabled: limits.enabled,
        enforce: limits.enforce,
        default_rule: RateLimitRule {
            max_requests: limits.max_requests,
            window_secs: limits.window_secs,
        },
        entries: state.limiter.snapshot(),
    })
}

pub async fn get_queues(State(state): State<AppState>) -> Json<Vec<QueueSummary>> {
    let summaries = state
        .queues
        .all()
        .into_iter()
        .map(|queue| QueueSummary {
            name: queue.name(),
            config: queue.config().clone(),
            stats: queue.stats(),
        })
        .collect();
    Json(summaries)
}
