use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

/// Connect with the defaults the CLI uses when no config is present.
pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 5).await
}

/// Pooled SQLite connection. Foreign keys and WAL are non-negotiable for the
/// approval tables; the busy timeout covers concurrent coordinators hitting
/// the same bid.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    busy_timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let busy_timeout_ms = busy_timeout_secs.max(1) * 1000;
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(30))
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
