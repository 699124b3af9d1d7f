use std::sync::Arc;

use coursework_config::Config;
use coursework_contracts::git::GitBackend;
use coursework_contracts::journal::JournalStore;
use coursework_contracts::store::{
    AssignmentsRepo, GradeablesRepo, OopsiesRepo, PeerReviewRepo, SessionsRepo, SubmissionsRepo,
    UsersRepo,
};
use coursework_contracts::validator::PatchsetValidator;

/// Everything a component needs to touch the store, the grading repo, and
/// the journal, bundled so `DeadlineRunner` and `Orchestrator` entry points
/// take one argument instead of eight.
#[derive(Clone)]
pub struct CoreContext {
    pub assignments: Arc<dyn AssignmentsRepo>,
    pub users: Arc<dyn UsersRepo>,
    pub submissions: Arc<dyn SubmissionsRepo>,
    pub gradeables: Arc<dyn GradeablesRepo>,
    pub peer_review: Arc<dyn PeerReviewRepo>,
    pub sessions: Arc<dyn SessionsRepo>,
    pub oopsies: Arc<dyn OopsiesRepo>,
    pub journal: Arc<dyn JournalStore>,
    pub git: Arc<dyn GitBackend>,
    pub validator: Arc<dyn PatchsetValidator>,
    pub config: Arc<Config>,
}

impl CoreContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        assignments: Arc<dyn AssignmentsRepo>,
        users: Arc<dyn UsersRepo>,
        submissions: Arc<dyn SubmissionsRepo>,
        gradeables: Arc<dyn GradeablesRepo>,
        peer_review: Arc<dyn PeerReviewRepo>,
        sessions: Arc<dyn SessionsRepo>,
        oopsies: Arc<dyn OopsiesRepo>,
        journal: Arc<dyn JournalStore>,
        git: Arc<dyn GitBackend>,
        validator: Arc<dyn PatchsetValidator>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            assignments,
            users,
            submissions,
            gradeables,
            peer_review,
            sessions,
            oopsies,
            journal,
            git,
            validator,
            config,
        }
    }
}
