use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use pitboss_core::PlatformError;

/// Connects to Postgres with a bounded pool and runs embedded migrations.
/// Every component crate is handed a clone of the resulting `PgPool` — it is
/// itself `Arc`-backed internally, so cloning is cheap and shares the
/// underlying connection set, mirroring the single shared database handle
/// the concurrency model (§5) calls for.
pub async fn connect(dsn: &str, max_connections: u32) -> Result<PgPool, PlatformError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(dsn)
        .await?;
    Ok(pool)
}

/// Runs the embedded schema migrations against an already-connected pool.
pub async fn migrate(pool: &PgPool) -> Result<(), PlatformError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| PlatformError::Internal(format!("migration failed: {e}")))?;
    Ok(())
}

/// Cheap connectivity probe used by `GetSystemStatus`.
pub async fn is_connected(pool: &PgPool) -> bool {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await.is_ok()
}
