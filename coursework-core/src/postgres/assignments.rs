use async_trait::async_trait;
use sqlx::PgPool;

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::store::AssignmentsRepo;
use coursework_model::{Assignment, Stage};

#[derive(Clone, Debug)]
pub struct PostgresAssignmentsRepo {
    pool: PgPool,
}

impl PostgresAssignmentsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn deadline_column(stage: Stage) -> &'static str {
    match stage {
        Stage::Initial => "initial_due",
        Stage::Peer => "peer_review_due",
        Stage::Final => "final_due",
    }
}

#[async_trait]
impl AssignmentsRepo for PostgresAssignmentsRepo {
    async fn create(&self, assignment: &Assignment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO assignments (name, initial_due, peer_review_due, final_due) VALUES ($1, $2, $3, $4)",
        )
        .bind(&assignment.name)
        .bind(assignment.initial_due)
        .bind(assignment.peer_review_due)
        .bind(assignment.final_due)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if let Some(db_err) = err.as_database_error() {
                if db_err.constraint() == Some("assignments_name_key") {
                    return StoreError::Conflict(format!("assignment {} already exists", assignment.name));
                }
            }
            StoreError::Database(err.to_string())
        })?;
        Ok(())
    }

    async fn alter(
        &self,
        name: &str,
        initial_due: Option<i64>,
        peer_review_due: Option<i64>,
        final_due: Option<i64>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE assignments SET \
                initial_due = COALESCE($2, initial_due), \
                peer_review_due = COALESCE($3, peer_review_due), \
                final_due = COALESCE($4, final_due) \
             WHERE name = $1",
        )
        .bind(name)
        .bind(initial_due)
        .bind(peer_review_due)
        .bind(final_due)
        .execute(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("assignment {name} not found")));
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM assignments WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("assignment {name} not found")));
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> StoreResult<Option<Assignment>> {
        sqlx::query_as::<_, Assignment>(
            "SELECT id, name, initial_due, peer_review_due, final_due FROM assignments WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Assignment>> {
        sqlx::query_as::<_, Assignment>(
            "SELECT id, name, initial_due, peer_review_due, final_due FROM assignments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))
    }

    async fn list(&self) -> StoreResult<Vec<Assignment>> {
        sqlx::query_as::<_, Assignment>(
            "SELECT id, name, initial_due, peer_review_due, final_due FROM assignments ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))
    }

    async fn set_deadline_now(&self, id: i64, stage: Stage, now: i64) -> StoreResult<()> {
        let column = deadline_column(stage);
        let sql = format!("UPDATE assignments SET {column} = $2 WHERE id = $1");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("assignment id {id} not found")));
        }
        Ok(())
    }
}
