//! API layer - HTTP endpoint handlers.

mod health;
mod metrics;
mod routes;

// Re-export all handlers for use in server/app.rs
pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
