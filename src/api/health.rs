//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::NotifierStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub backends: BackendsResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresHealthResponse>,
}

#[derive(Debug, Serialize)]
pub struct BackendsResponse {
    pub users: String,
    pub notifications: String,
    pub push: String,
}

#[derive(Debug, Serialize)]
pub struct PostgresHealthResponse {
    pub status: String,
    pub connected: bool,
    pub pool_size: u32,
    pub idle_connections: u32,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub notifier: NotifierStatsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = state.start_time.elapsed().as_secs();

    let postgres = match state.postgres_pool {
        Some(ref pool) => {
            let connected = match pool.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "PostgreSQL health check failed");
                    false
                }
            };
            let inner_pool = pool.pool();
            Some(PostgresHealthResponse {
                status: if connected { "connected" } else { "unreachable" }.to_string(),
                connected,
                pool_size: inner_pool.size(),
                idle_connections: inner_pool.num_idle() as u32,
            })
        }
        None => None,
    };

    let healthy = postgres.as_ref().map_or(true, |p| p.connected);
    let status = if healthy { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        backends: BackendsResponse {
            users: state.notifier.users_backend().to_string(),
            notifications: state.notifier.store_backend().to_string(),
            push: state.notifier.push_backend().to_string(),
        },
        postgres,
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        notifier: state.notifier.stats(),
    })
}
