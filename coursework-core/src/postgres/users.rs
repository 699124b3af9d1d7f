use async_trait::async_trait;
use sqlx::PgPool;

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::store::UsersRepo;
use coursework_model::User;

#[derive(Clone, Debug)]
pub struct PostgresUsersRepo {
    pool: PgPool,
}

impl PostgresUsersRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsersRepo for PostgresUsersRepo {
    async fn get(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT username, pwdhash, student_id, fullname FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT username, pwdhash, student_id, fullname FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))
    }

    async fn get_by_student_id(&self, student_id: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT username, pwdhash, student_id, fullname FROM users WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))
    }

    async fn set_pwdhash(&self, username: &str, pwdhash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET pwdhash = $2 WHERE username = $1")
            .bind(username)
            .bind(pwdhash)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {username} not found")));
        }
        Ok(())
    }
}
