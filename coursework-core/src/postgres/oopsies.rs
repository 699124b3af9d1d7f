use async_trait::async_trait;
use sqlx::PgPool;

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::store::OopsiesRepo;
use coursework_model::Oopsie;

#[derive(Clone, Debug)]
pub struct PostgresOopsiesRepo {
    pool: PgPool,
}

impl PostgresOopsiesRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OopsiesRepo for PostgresOopsiesRepo {
    async fn list_for_assignment(&self, assignment: &str) -> StoreResult<Vec<Oopsie>> {
        sqlx::query_as::<_, Oopsie>(
            "SELECT username AS user, assignment, timestamp FROM oopsies WHERE assignment = $1",
        )
        .bind(assignment)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))
    }
}
