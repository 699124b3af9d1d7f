use async_trait::async_trait;
use coursework_model::{Assignment, Gradeable, Oopsie, PeerReviewAssignment, Session, Submission, User};
use coursework_model::stage::Component;

use crate::error::StoreResult;

/// Assignment table: created by the Configurator, mutated only via
/// explicit alter, destroyed via remove.
#[async_trait]
pub trait AssignmentsRepo: Send + Sync {
    async fn create(&self, assignment: &Assignment) -> StoreResult<()>;
    async fn alter(
        &self,
        name: &str,
        initial_due: Option<i64>,
        peer_review_due: Option<i64>,
        final_due: Option<i64>,
    ) -> StoreResult<()>;
    async fn remove(&self, name: &str) -> StoreResult<()>;
    async fn get(&self, name: &str) -> StoreResult<Option<Assignment>>;
    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Assignment>>;
    async fn list(&self) -> StoreResult<Vec<Assignment>>;

    /// Atomically set a single deadline to `now`, used by the Orchestrator
    /// when handling a TRIGGER.
    async fn set_deadline_now(
        &self,
        id: i64,
        stage: coursework_model::Stage,
        now: i64,
    ) -> StoreResult<()>;
}

/// Roster table.
#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn get(&self, username: &str) -> StoreResult<Option<User>>;
    async fn list(&self) -> StoreResult<Vec<User>>;
    async fn get_by_student_id(&self, student_id: &str) -> StoreResult<Option<User>>;

    /// Registration: exchange a `student_id` for a generated password by
    /// atomically setting `pwdhash` on the placeholder row.
    async fn set_pwdhash(&self, username: &str, pwdhash: &str) -> StoreResult<()>;
}

/// Raw mail-session records.
#[async_trait]
pub trait SubmissionsRepo: Send + Sync {
    async fn insert(&self, submission: &Submission) -> StoreResult<()>;
    async fn get(&self, submission_id: &str) -> StoreResult<Option<Submission>>;
    async fn set_status(&self, submission_id: &str, status: &str) -> StoreResult<()>;
    async fn count_for_user_and_assignment(&self, assignment: &str, user: &str) -> StoreResult<i64>;
    async fn list_for_assignment(&self, assignment: &str) -> StoreResult<Vec<Submission>>;
}

/// Per-stage work items.
#[async_trait]
pub trait GradeablesRepo: Send + Sync {
    async fn insert(&self, gradeable: &Gradeable) -> StoreResult<()>;

    /// The most-recent gradeable per user for `(assignment, component)`, or
    /// `None` for users with no gradeable at all in this run.
    async fn most_recent_per_user(
        &self,
        assignment: &str,
        component: Component,
    ) -> StoreResult<Vec<(String, Option<Gradeable>)>>;

    async fn get_by_submission(&self, submission_id: &str) -> StoreResult<Option<Gradeable>>;
}

/// Peer-review pairings formed at the initial deadline.
#[async_trait]
pub trait PeerReviewRepo: Send + Sync {
    async fn insert_many(&self, pairings: &[PeerReviewAssignment]) -> StoreResult<()>;
    async fn get_for(&self, assignment: &str, reviewer: &str) -> StoreResult<Option<PeerReviewAssignment>>;
}

/// Web/mail-auth sessions.
#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create(&self, session: &Session) -> StoreResult<()>;
    async fn get(&self, token: &str) -> StoreResult<Option<Session>>;
    async fn delete_for_user(&self, username: &str) -> StoreResult<()>;
    async fn delete_expired(&self, now: i64) -> StoreResult<u64>;
}

/// Per-semester excuses.
#[async_trait]
pub trait OopsiesRepo: Send + Sync {
    async fn list_for_assignment(&self, assignment: &str) -> StoreResult<Vec<Oopsie>>;
}
