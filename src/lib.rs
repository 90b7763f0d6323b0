// Infrastructure layer (shared components)
pub mod infrastructure;

// Re-export infrastructure modules for shorter paths
pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::postgres;

// Domain layer (business logic)
pub mod document;
pub mod notification;
pub mod push;
pub mod rules;
pub mod store;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;

// Supporting modules
pub mod telemetry;
