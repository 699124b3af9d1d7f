use std::sync::Arc;

use coursework_config::{ConfigLoad, ConfigLoader};
use coursework_core::context::CoreContext;
use coursework_core::postgres::{
    self, PostgresAssignmentsRepo, PostgresGradeablesRepo, PostgresOopsiesRepo, PostgresPeerReviewRepo,
    PostgresSessionsRepo, PostgresSubmissionsRepo, PostgresUsersRepo,
};
use coursework_core::{FileJournalStore, GitPatchsetValidator, ProcessGitBackend};
use tracing_subscriber::EnvFilter;

/// Shared by every binary: init logging, load config, connect to Postgres,
/// and assemble a `CoreContext`. No binary reads the environment or a
/// config file directly outside this function.
pub async fn bootstrap(component: &str) -> anyhow::Result<(CoreContext, ConfigLoad)> {
    init_tracing(component);

    let loaded = ConfigLoader::new().load()?;
    for warning in loaded.warnings.items.iter() {
        tracing::warn!(message = %warning.message, hint = ?warning.hint, "configuration warning");
    }

    let config = Arc::new(loaded.config.clone());
    let pool = postgres::connect(&config.database.url).await?;

    let git: Arc<dyn coursework_contracts::git::GitBackend> = Arc::new(ProcessGitBackend::default());
    let journal = Arc::new(FileJournalStore::new(&config.journal_root)?);
    let validator = Arc::new(GitPatchsetValidator::new(git.clone(), config.clone()));

    let ctx = CoreContext::new(
        Arc::new(PostgresAssignmentsRepo::new(pool.clone())),
        Arc::new(PostgresUsersRepo::new(pool.clone())),
        Arc::new(PostgresSubmissionsRepo::new(pool.clone())),
        Arc::new(PostgresGradeablesRepo::new(pool.clone())),
        Arc::new(PostgresPeerReviewRepo::new(pool.clone())),
        Arc::new(PostgresSessionsRepo::new(pool.clone())),
        Arc::new(PostgresOopsiesRepo::new(pool.clone())),
        journal,
        git,
        validator,
        config,
    );

    Ok((ctx, loaded))
}

fn init_tracing(component: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let is_daemon = component == "orchestrator";

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if is_daemon {
        subscriber.json().init();
    } else {
        subscriber.compact().init();
    }
}
