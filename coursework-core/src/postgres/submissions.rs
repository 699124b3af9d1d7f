use async_trait::async_trait;
use sqlx::PgPool;

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::store::SubmissionsRepo;
use coursework_model::Submission;

#[derive(Clone, Debug)]
pub struct PostgresSubmissionsRepo {
    pool: PgPool,
}

impl PostgresSubmissionsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "submission_id, timestamp, username AS user, recipient, email_count, in_reply_to, status";

#[async_trait]
impl SubmissionsRepo for PostgresSubmissionsRepo {
    async fn insert(&self, submission: &Submission) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO submissions (submission_id, timestamp, username, recipient, email_count, in_reply_to, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&submission.submission_id)
        .bind(submission.timestamp)
        .bind(&submission.user)
        .bind(&submission.recipient)
        .bind(submission.email_count)
        .bind(&submission.in_reply_to)
        .bind(&submission.status)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if let Some(db_err) = err.as_database_error() {
                if db_err.constraint() == Some("submissions_pkey") {
                    return StoreError::Conflict(format!(
                        "submission {} already ingested",
                        submission.submission_id
                    ));
                }
            }
            StoreError::Database(err.to_string())
        })?;
        Ok(())
    }

    async fn get(&self, submission_id: &str) -> StoreResult<Option<Submission>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM submissions WHERE submission_id = $1");
        sqlx::query_as::<_, Submission>(&sql)
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))
    }

    async fn set_status(&self, submission_id: &str, status: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE submissions SET status = $2 WHERE submission_id = $1")
            .bind(submission_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("submission {submission_id} not found")));
        }
        Ok(())
    }

    async fn count_for_user_and_assignment(&self, assignment: &str, user: &str) -> StoreResult<i64> {
        let recipient_prefix = format!("{assignment}%");
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM submissions WHERE username = $1 AND recipient LIKE $2",
        )
        .bind(user)
        .bind(recipient_prefix)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))?;
        Ok(row.0)
    }

    async fn list_for_assignment(&self, assignment: &str) -> StoreResult<Vec<Submission>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM submissions WHERE recipient LIKE $1 ORDER BY timestamp"
        );
        let recipient_prefix = format!("{assignment}%");
        sqlx::query_as::<_, Submission>(&sql)
            .bind(recipient_prefix)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))
    }
}
