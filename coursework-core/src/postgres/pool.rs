use sqlx::postgres::{PgPool, PgPoolOptions};

use coursework_contracts::error::{StoreError, StoreResult};

/// Connects to Postgres and runs the embedded migration set. Every
/// top-level binary calls this exactly once at startup and threads the
/// resulting pool into the repository constructors.
pub async fn connect(database_url: &str) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|err| StoreError::Database(format!("failed to connect to database: {err}")))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|err| StoreError::Database(format!("failed to run migrations: {err}")))?;

    Ok(pool)
}
