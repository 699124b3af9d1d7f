//! PostgreSQL-backed implementations of every `coursework-contracts` store
//! trait, plus the connect-and-migrate entry point used by every binary.

mod assignments;
mod gradeables;
mod oopsies;
mod peer_review;
mod pool;
mod sessions;
mod submissions;
mod users;

pub use assignments::PostgresAssignmentsRepo;
pub use gradeables::PostgresGradeablesRepo;
pub use oopsies::PostgresOopsiesRepo;
pub use peer_review::PostgresPeerReviewRepo;
pub use pool::connect;
pub use sessions::PostgresSessionsRepo;
pub use submissions::PostgresSubmissionsRepo;
pub use users::PostgresUsersRepo;
