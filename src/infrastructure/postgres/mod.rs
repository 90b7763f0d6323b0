//! PostgreSQL persistence module.
//!
//! Provides the connection pool behind the `postgres` store backend.
//! Expected tables are in `sql/schema.sql`.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
