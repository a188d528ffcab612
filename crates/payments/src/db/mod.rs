//! Database operations for the payments `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `users` - Marketplace users (read-only here)
//! - `user_profiles` - Per-user payment identity (`account_id`, `customer_id`)
//! - `listings` / `locations` - Read-only checkout metadata
//! - `transactions` - The charge ledger, unique on
//!   `(booking_id, transaction_id)`
//!
//! Queries are runtime-checked (`query_as` over `FromRow` rows) rather than
//! compile-time macros: this crate is a library and cannot assume its
//! embedders have a database or a prepared query cache at build time.
//!
//! # Migrations
//!
//! The schema this crate owns lives in `crates/payments/migrations/`; the
//! embedding application applies it.

pub mod profiles;
pub mod transactions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g. duplicate ledger key).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
