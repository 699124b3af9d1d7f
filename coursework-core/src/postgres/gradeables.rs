use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::store::GradeablesRepo;
use coursework_model::stage::Component;
use coursework_model::{AutoFeedback, Gradeable};

#[derive(Clone, Debug)]
pub struct PostgresGradeablesRepo {
    pool: PgPool,
}

impl PostgresGradeablesRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_gradeable(row: sqlx::postgres::PgRow) -> StoreResult<Gradeable> {
    let component_raw: String = row.try_get("component").map_err(|err| StoreError::Database(err.to_string()))?;
    let component = Component::from_str(&component_raw)
        .map_err(|err| StoreError::Malformed(format!("corrupt component column: {err}")))?;
    let auto_feedback: String =
        row.try_get("auto_feedback").map_err(|err| StoreError::Database(err.to_string()))?;

    Ok(Gradeable {
        submission_id: row.try_get("submission_id").map_err(|err| StoreError::Database(err.to_string()))?,
        timestamp: row.try_get("timestamp").map_err(|err| StoreError::Database(err.to_string()))?,
        user: row.try_get("username").map_err(|err| StoreError::Database(err.to_string()))?,
        assignment: row.try_get("assignment").map_err(|err| StoreError::Database(err.to_string()))?,
        component,
        auto_feedback: AutoFeedback::new(auto_feedback),
    })
}

#[async_trait]
impl GradeablesRepo for PostgresGradeablesRepo {
    async fn insert(&self, gradeable: &Gradeable) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO gradeables (submission_id, timestamp, username, assignment, component, auto_feedback) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&gradeable.submission_id)
        .bind(gradeable.timestamp)
        .bind(&gradeable.user)
        .bind(&gradeable.assignment)
        .bind(gradeable.component.as_str())
        .bind(gradeable.auto_feedback.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if let Some(db_err) = err.as_database_error() {
                if db_err.constraint() == Some("gradeables_pkey") {
                    return StoreError::Conflict(format!(
                        "gradeable for submission {} already recorded",
                        gradeable.submission_id
                    ));
                }
            }
            StoreError::Database(err.to_string())
        })?;
        Ok(())
    }

    async fn most_recent_per_user(
        &self,
        assignment: &str,
        component: Component,
    ) -> StoreResult<Vec<(String, Option<Gradeable>)>> {
        // The candidate set is every user who has ever submitted anything
        // for this assignment, not just those with a gradeable in
        // `component` — a user who never reached this stage still needs to
        // show up with `None` so DeadlineRunner can mark them past-due.
        let recipient_prefix = format!("{assignment}%");
        let rows = sqlx::query(
            "SELECT u.username AS candidate, \
                    g.submission_id, g.timestamp, g.username, g.assignment, g.component, g.auto_feedback \
             FROM (SELECT DISTINCT username FROM submissions WHERE recipient LIKE $1) u \
             LEFT JOIN LATERAL ( \
                 SELECT * FROM gradeables g2 \
                 WHERE g2.assignment = $2 AND g2.component = $3 AND g2.username = u.username \
                 ORDER BY g2.timestamp DESC LIMIT 1 \
             ) g ON true \
             ORDER BY u.username",
        )
        .bind(recipient_prefix)
        .bind(assignment)
        .bind(component.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let candidate: String = row.try_get("candidate").map_err(|err| StoreError::Database(err.to_string()))?;
            let has_gradeable: Option<String> =
                row.try_get("submission_id").map_err(|err| StoreError::Database(err.to_string()))?;
            let gradeable = if has_gradeable.is_some() { Some(row_to_gradeable(row)?) } else { None };
            out.push((candidate, gradeable));
        }
        Ok(out)
    }

    async fn get_by_submission(&self, submission_id: &str) -> StoreResult<Option<Gradeable>> {
        let row = sqlx::query(
            "SELECT submission_id, timestamp, username, assignment, component, auto_feedback \
             FROM gradeables WHERE submission_id = $1",
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))?;

        row.map(row_to_gradeable).transpose()
    }
}
