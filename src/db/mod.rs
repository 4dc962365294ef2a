//! Database layer
//!
//! SQLite (default, single file) and MySQL behind the `DatabasePool` trait.
//! The driver is selected from `DatabaseConfig`.
//!
//! # Usage
//!
//! ```ignore
//! use travel_blog::config::DatabaseConfig;
//! use travel_blog::db::{create_pool, migrations};
//!
//! let config = DatabaseConfig::default();
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool, config.migrations_dir.as_deref()).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, Database, DatabasePool, DynDatabasePool};

/// Whether an error raised by a repository is a unique-constraint violation
/// reported by the store.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
        )
    })
}
