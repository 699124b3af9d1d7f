use async_trait::async_trait;
use sqlx::PgPool;

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::store::PeerReviewRepo;
use coursework_model::PeerReviewAssignment;

#[derive(Clone, Debug)]
pub struct PostgresPeerReviewRepo {
    pool: PgPool,
}

impl PostgresPeerReviewRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PeerReviewRepo for PostgresPeerReviewRepo {
    async fn insert_many(&self, pairings: &[PeerReviewAssignment]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|err| StoreError::Database(err.to_string()))?;

        for pairing in pairings {
            sqlx::query(
                "INSERT INTO peer_review_assignments (assignment, reviewer, reviewee1, reviewee2) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&pairing.assignment)
            .bind(&pairing.reviewer)
            .bind(&pairing.reviewee1)
            .bind(&pairing.reviewee2)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if let Some(db_err) = err.as_database_error() {
                    if db_err.constraint() == Some("peer_review_assignments_pkey") {
                        return StoreError::Conflict(format!(
                            "peer review pairing for {} already exists for {}",
                            pairing.reviewer, pairing.assignment
                        ));
                    }
                }
                StoreError::Database(err.to_string())
            })?;
        }

        tx.commit().await.map_err(|err| StoreError::Database(err.to_string()))?;
        Ok(())
    }

    async fn get_for(&self, assignment: &str, reviewer: &str) -> StoreResult<Option<PeerReviewAssignment>> {
        sqlx::query_as::<_, PeerReviewAssignment>(
            "SELECT assignment, reviewer, reviewee1, reviewee2 FROM peer_review_assignments \
             WHERE assignment = $1 AND reviewer = $2",
        )
        .bind(assignment)
        .bind(reviewer)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Database(err.to_string()))
    }
}
