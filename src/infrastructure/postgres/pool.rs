//! PostgreSQL connection pool shared by the user directory and notification store.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Errors that can occur with the PostgreSQL pool.
#[derive(Debug, Error)]
pub enum PostgresPoolError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),
}

/// PostgreSQL connection pool.
#[derive(Clone)]
pub struct PostgresPool {
    /// The underlying connection pool
    pool: PgPool,

    /// Database URL (for logging purposes)
    database_url: String,
}

impl PostgresPool {
    /// Create a new PostgreSQL pool from configuration.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, PostgresPoolError> {
        if config.url.trim().is_empty() {
            return Err(PostgresPoolError::ConnectionUnavailable(
                "database.url is empty".to_string(),
            ));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds as u64))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds as u64))
            .connect(&config.url)
            .await?;

        let pool = Self {
            pool,
            database_url: config.url.clone(),
        };

        tracing::info!(
            pool_size = config.pool_size,
            url = %pool.database_url_masked(),
            "PostgreSQL connection pool created"
        );

        Ok(pool)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip a trivial query, used by the health endpoint.
    pub async fn ping(&self) -> Result<(), PostgresPoolError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get the database URL (masked for logging).
    pub fn database_url_masked(&self) -> String {
        mask_url(&self.database_url)
    }

    /// Close the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL connection pool closed");
    }
}

/// Mask the password in a connection URL
fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            // "postgres://user@host" has no password, only the scheme colon
            if !url[colon_pos..].starts_with("://") {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return format!("{}***{}", prefix, suffix);
            }
        }
    }
    url.to_string()
}
