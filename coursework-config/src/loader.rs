use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use thiserror::Error;
use url::Url;

use crate::models::{AuthConfig, Config, ConfigMetadata, DatabaseConfig, GitConfig, LogFormat, OrchestratorSignalConfig};
use crate::sources::{EnvConfig, FileConfig};
use crate::validation::{self, ConfigGuardRailError, ConfigWarnings};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("coursework.toml"),
        PathBuf::from("config/coursework.toml"),
    ]
});

const DEFAULT_JOURNAL_ROOT: &str = "./var/journal";
const DEFAULT_PATCHSET_ROOT: &str = "./var/patchsets";
const DEFAULT_REPO_ROOT: &str = "./var/grading-repo";
const DEFAULT_NOTES_REF: &str = "refs/notes/grading";
const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 7;
const DEFAULT_BCRYPT_COST: u32 = 12;
const DEFAULT_RELOAD_SIGNAL: i32 = 10; // SIGUSR1
const DEFAULT_TRIGGER_SIGNAL: i32 = 34; // lowest real-time signal on Linux

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

/// Composes a fully-resolved `Config` from (in increasing precedence) a
/// TOML file, environment variables, and explicit overrides applied by the
/// caller after construction. No component outside this loader reads the
/// environment or a file directly.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path)
                .map(|_| true)
                .or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let env_config = EnvConfig::gather();
        let (file_config, config_path, config_present) = self.load_file_config(&env_config)?;

        let (config, warnings) =
            self.compose_config(file_config, env_config, config_path, env_file_loaded, config_present)?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>, bool), ConfigLoadError> {
        let explicit = self.options.config_path.clone().or_else(|| env_config.config_path.clone());
        let is_explicit = explicit.is_some();

        let resolved = explicit.or_else(|| {
            DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned()
        });

        let Some(path) = resolved else {
            return Ok((None, None, false));
        };

        if !path.exists() {
            if is_explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None, false));
        }

        let contents = fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
            path: path.clone(),
            source: err,
        })?;
        let file_config: FileConfig = toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
            path: path.clone(),
            source: err,
        })?;

        Ok((Some(file_config), Some(path), true))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
        env_file_loaded: bool,
        config_present: bool,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if !config_present {
            warnings.push_with_hint(
                "no coursework.toml detected; falling back to environment variables and defaults",
                "set COURSEWORK_CONFIG_PATH or place coursework.toml in the working directory",
            );
        }

        let file = file_config.unwrap_or_default();

        let database_url = env
            .database_url
            .clone()
            .or(file.database.url.clone())
            .ok_or(ConfigLoadError::MissingDatabaseUrl)?;

        let journal_root = env
            .journal_root
            .clone()
            .or(file.journal_root.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JOURNAL_ROOT));

        let patchset_root = env
            .patchset_root
            .clone()
            .or(file.patchset_root.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PATCHSET_ROOT));

        let repo_root = env
            .git_repo_root
            .clone()
            .or(file.git.repo_root.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPO_ROOT));

        let mailman_remote_raw = env
            .git_mailman_remote
            .clone()
            .or(file.git.mailman_remote.clone())
            .ok_or(ConfigLoadError::MissingGitRemote { identity: "mailman" })?;
        let mailman_remote = Url::parse(&mailman_remote_raw).map_err(|source| ConfigLoadError::InvalidGitRemote {
            identity: "mailman",
            source,
        })?;

        let denis_remote_raw = env
            .git_denis_remote
            .clone()
            .or(file.git.denis_remote.clone())
            .unwrap_or_else(|| mailman_remote_raw.clone());
        let denis_remote = Url::parse(&denis_remote_raw).map_err(|source| ConfigLoadError::InvalidGitRemote {
            identity: "denis",
            source,
        })?;

        let notes_ref = env
            .git_notes_ref
            .clone()
            .or(file.git.notes_ref.clone())
            .unwrap_or_else(|| DEFAULT_NOTES_REF.to_string());

        let session_ttl_secs = env
            .session_ttl_secs
            .or(file.auth.session_ttl_secs)
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);

        let bcrypt_cost = env.bcrypt_cost.or(file.auth.bcrypt_cost).unwrap_or(DEFAULT_BCRYPT_COST);

        let reload_signal = env.reload_signal.or(file.orchestrator.reload_signal).unwrap_or(DEFAULT_RELOAD_SIGNAL);
        let trigger_signal = env
            .trigger_signal
            .or(file.orchestrator.trigger_signal)
            .unwrap_or(DEFAULT_TRIGGER_SIGNAL);

        let log_format_raw = env.log_format.clone().or(file.log_format.clone());
        let log_format = match log_format_raw.as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigLoadError::InvalidLogFormat(other.to_string())),
        };

        let config = Config {
            database: DatabaseConfig { url: database_url },
            journal_root,
            patchset_root,
            git: GitConfig {
                repo_root,
                mailman_remote,
                denis_remote,
                notes_ref,
            },
            auth: AuthConfig {
                session_ttl_secs,
                bcrypt_cost,
            },
            orchestrator: OrchestratorSignalConfig {
                reload_signal,
                trigger_signal,
            },
            log_format,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no database URL configured (set database.url or $DATABASE_URL)")]
    MissingDatabaseUrl,
    #[error("no git remote configured for {identity} (set git.{identity}_remote or $GIT_{identity}_REMOTE)")]
    MissingGitRemote { identity: &'static str },
    #[error("invalid git remote URL for {identity}")]
    InvalidGitRemote {
        identity: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid log_format '{0}' (expected 'text' or 'json')")]
    InvalidLogFormat(String),
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
