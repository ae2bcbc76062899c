//! Schema migrations for the Postgres-backed document store.

use crate::error::{DbError, DbResult};
use sqlx::PgPool;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error when migration execution fails.
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|source| DbError::MigrationFailed { source })
}
