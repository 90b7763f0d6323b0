use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};
use crate::triggers::receive_event;

use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Change-feed webhook
        .nest(
            "/api/v1",
            Router::new()
                .route("/events", post(receive_event))
                .route_layer(middleware::from_fn_with_state(state, api_key_auth)),
        )
}
