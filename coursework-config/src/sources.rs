use std::{env, path::PathBuf};

use serde::Deserialize;

/// Raw configuration as defined in a TOML file. Every field is optional so
/// a partial file can be layered under environment variables.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub journal_root: Option<PathBuf>,
    #[serde(default)]
    pub patchset_root: Option<PathBuf>,
    #[serde(default)]
    pub git: FileGitConfig,
    #[serde(default)]
    pub auth: FileAuthConfig,
    #[serde(default)]
    pub orchestrator: FileOrchestratorConfig,
    pub log_format: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileDatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileGitConfig {
    pub repo_root: Option<PathBuf>,
    pub mailman_remote: Option<String>,
    pub denis_remote: Option<String>,
    pub notes_ref: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileAuthConfig {
    pub session_ttl_secs: Option<i64>,
    pub bcrypt_cost: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileOrchestratorConfig {
    pub reload_signal: Option<i32>,
    pub trigger_signal: Option<i32>,
}

/// Configuration gathered from the process environment. Every field mirrors
/// an entry in `FileConfig` so the loader can lay env values over file
/// values with a single `or`.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub database_url: Option<String>,
    pub journal_root: Option<PathBuf>,
    pub patchset_root: Option<PathBuf>,
    pub git_repo_root: Option<PathBuf>,
    pub git_mailman_remote: Option<String>,
    pub git_denis_remote: Option<String>,
    pub git_notes_ref: Option<String>,
    pub session_ttl_secs: Option<i64>,
    pub bcrypt_cost: Option<u32>,
    pub reload_signal: Option<i32>,
    pub trigger_signal: Option<i32>,
    pub log_format: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: env::var("COURSEWORK_CONFIG_PATH").ok().map(PathBuf::from),
            database_url: non_empty(env::var("DATABASE_URL").ok()),
            journal_root: env::var("JOURNAL_ROOT").ok().map(PathBuf::from),
            patchset_root: env::var("PATCHSET_ROOT").ok().map(PathBuf::from),
            git_repo_root: env::var("GIT_REPO_ROOT").ok().map(PathBuf::from),
            git_mailman_remote: non_empty(env::var("GIT_MAILMAN_REMOTE").ok()),
            git_denis_remote: non_empty(env::var("GIT_DENIS_REMOTE").ok()),
            git_notes_ref: non_empty(env::var("GIT_NOTES_REF").ok()),
            session_ttl_secs: env::var("SESSION_TTL_SECS").ok().and_then(|v| v.parse().ok()),
            bcrypt_cost: env::var("BCRYPT_COST").ok().and_then(|v| v.parse().ok()),
            reload_signal: env::var("ORCHESTRATOR_RELOAD_SIGNAL").ok().and_then(|v| v.parse().ok()),
            trigger_signal: env::var("ORCHESTRATOR_TRIGGER_SIGNAL").ok().and_then(|v| v.parse().ok()),
            log_format: non_empty(env::var("LOG_FORMAT").ok()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
