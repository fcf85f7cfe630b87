//! Database Module
//!
//! PostgreSQL connection pool, migrations, and transaction management.

pub mod unit_of_work;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::DatabaseSettings;
use crate::shared::error::AppError;

pub use unit_of_work::{PgUnitOfWork, TransactionContext};

/// Create a PostgreSQL connection pool
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect(&settings.url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Translate constraint violations into domain errors.
///
/// Unique violations become `Conflict`, foreign key violations `NotFound`.
/// Everything else stays a database error.
pub(crate) fn map_constraint(err: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Conflict(format!("{} already exists", what));
        }
        if db.is_foreign_key_violation() {
            return AppError::NotFound(format!("{} references a missing row", what));
        }
    }
    AppError::Database(err)
}
