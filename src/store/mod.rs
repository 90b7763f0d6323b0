//! User profile and notification record storage.
//!
//! # Backends
//!
//! - `memory`: DashMap-backed stores, lost on restart (default)
//! - `postgres`: `users` and `notifications` tables through a shared pool
//!
//! Use [`create_stores`] to build both stores from configuration.

mod backend;
mod memory_backend;
mod postgres_backend;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StoreConfig;

pub use backend::{
    NewNotification, NotificationStore, StoreError, StoredNotification, UserDirectory, UserProfile,
};
pub use memory_backend::{MemoryNotificationStore, MemoryUserDirectory};
pub use postgres_backend::{PostgresNotificationStore, PostgresUserDirectory};

/// Store pair used by the notifier
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserDirectory>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    /// Fresh in-memory stores
    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryUserDirectory::new()),
            notifications: Arc::new(MemoryNotificationStore::new()),
        }
    }
}

/// Create the stores selected by configuration.
///
/// - `"postgres"`: PostgreSQL stores if a pool is provided
/// - `"memory"` (default): in-memory stores
///
/// Falls back to memory with a warning when PostgreSQL is requested without a pool.
pub fn create_stores(config: &StoreConfig, pool: Option<PgPool>) -> Stores {
    match config.backend.as_str() {
        "postgres" => {
            if let Some(pool) = pool {
                tracing::info!(backend = "postgres", "Creating PostgreSQL stores");
                Stores {
                    users: Arc::new(PostgresUserDirectory::new(pool.clone())),
                    notifications: Arc::new(PostgresNotificationStore::new(pool)),
                }
            } else {
                tracing::warn!(
                    "PostgreSQL store requested but no database configured, falling back to memory"
                );
                Stores::memory()
            }
        }
        other => {
            if other != "memory" {
                tracing::warn!(backend = %other, "Unknown store backend, using memory");
            }
            tracing::info!(backend = "memory", "Creating memory stores");
            Stores::memory()
        }
    }
}
