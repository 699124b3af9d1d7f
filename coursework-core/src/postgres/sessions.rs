use async_trait::async_trait;
use sqlx::PgPool;

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::store::SessionsRepo;
use coursework_model::Session;

#[derive(Clone, Debug)]
pub struct PostgresSessionsRepo {
    pool: PgPool,
}

impl PostgresSessionsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionsRepo for PostgresSessionsRepo {
    async fn create(&self, session: &Session) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|err| StoreError::Database(err.to_string()))?;

        // At most one live session per user: clear any existing row first.
        sqlx::query("DELETE FROM sessions WHERE username = $1")
            .bind(&session.username)
            .execute(&mut *tx)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))?;

        sqlx::query("INSERT INTO sessions (token, username, expiry) VALUES ($1, $2, $3)")
            .bind(&session.token)
            .bind(&session.username)
            .bind(session.expiry)
            .execute(&mut *tx)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))?;

        tx.commit().await.map_err(|err| StoreError::Database(err.to_string()))?;
        Ok(())
    }

    async fn get(&self, token: &str) -> StoreResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT token, username, expiry FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))
    }

    async fn delete_for_user(&self, username: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))?;
        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expiry <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))?;
        Ok(result.rows_affected())
    }
}
