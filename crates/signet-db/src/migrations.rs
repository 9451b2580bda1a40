//! Embedded database migrations.

use sqlx::PgPool;

use crate::error::DbError;

/// Run all pending migrations against the given pool.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("database migrations complete");
    Ok(())
}
