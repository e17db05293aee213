pub mod repository;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::error::AppError;

pub use repository::SqliteBackend;

/// Opens the pool and brings the schema up to date.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Database(e.into()))?;
    info!("database ready at {}", database_url);

    Ok(pool)
}
