use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use shopfront_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Open the storefront database with the configured pool sizing.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

/// One SQLite file backs the catalog, orders and visitor sessions, so every
/// connection enables foreign keys and WAL before joining the pool, and the
/// busy timeout is matched to the acquire timeout so a checkout blocked on a
/// writer waits rather than failing immediately.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let acquire_timeout = Duration::from_secs(timeout_secs.max(1));
    let busy_timeout_ms = acquire_timeout.as_millis().min(30_000);

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(acquire_timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
