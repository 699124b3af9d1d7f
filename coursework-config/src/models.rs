use std::path::PathBuf;

use url::Url;

/// Fully resolved configuration, composed once at process start and handed
/// by value (or behind an `Arc`) into every constructor. Nothing downstream
/// reads the environment or a file directly.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub journal_root: PathBuf,
    pub patchset_root: PathBuf,
    pub git: GitConfig,
    pub auth: AuthConfig,
    pub orchestrator: OrchestratorSignalConfig,
    pub log_format: LogFormat,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Local working-copy root and remote endpoints for the single shared
/// grading repository. `mailman_remote` and `denis_remote` are usually the
/// same origin pushed to under two bot identities, but are tracked
/// separately since some deployments route tag pushes and notes pushes
/// through different remotes.
#[derive(Debug, Clone)]
pub struct GitConfig {
    pub repo_root: PathBuf,
    pub mailman_remote: Url,
    pub denis_remote: Url,
    pub notes_ref: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl_secs: i64,
    pub bcrypt_cost: u32,
}

/// Signal numbers the Orchestrator installs handlers for. Defaults mirror
/// the real-time signal layout used in production containers: `SIGUSR1` for
/// reload, the lowest available real-time signal for trigger.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSignalConfig {
    pub reload_signal: i32,
    pub trigger_signal: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Text
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
