use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::api::api_routes;

use super::AppState;

/// Snapshots are small documents; anything larger is not a change event
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(api_routes(state.clone()))
        // Add middleware
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.settings.server.cors_origins))
        // Add state
        .with_state(state)
}

/// CORS configuration; no configured origins means any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(allowed)
    }
}
