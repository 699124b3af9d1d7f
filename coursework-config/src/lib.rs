//! Typed configuration for every coursework binary: a single `Config`
//! assembled once at process start by [`ConfigLoader`] from a TOML file
//! layered under environment variables, then validated and handed by value
//! into every constructor. Nothing downstream touches the environment or a
//! config file directly.

mod loader;
mod models;
mod sources;
mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{AuthConfig, Config, ConfigMetadata, DatabaseConfig, GitConfig, LogFormat, OrchestratorSignalConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_minimal_file_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "coursework.toml",
            r#"
            [database]
            url = "postgres://localhost/coursework"

            [git]
            mailman_remote = "https://git.example.invalid/grading.git"
            "#,
        );

        let load = ConfigLoader::new()
            .with_config_path(path)
            .with_env_file(dir.path().join("nonexistent.env"))
            .load()
            .unwrap();

        assert_eq!(load.config.database.url, "postgres://localhost/coursework");
        assert_eq!(load.config.auth.bcrypt_cost, 12);
        assert_eq!(load.config.log_format, LogFormat::Text);
    }

    #[test]
    fn missing_database_url_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "coursework.toml",
            r#"
            [git]
            mailman_remote = "https://git.example.invalid/grading.git"
            "#,
        );

        let err = ConfigLoader::new()
            .with_config_path(path)
            .with_env_file(dir.path().join("nonexistent.env"))
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigLoadError::MissingDatabaseUrl));
    }

    #[test]
    fn explicit_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new()
            .with_config_path(dir.path().join("does-not-exist.toml"))
            .with_env_file(dir.path().join("nonexistent.env"))
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn rejects_out_of_range_bcrypt_cost() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "coursework.toml",
            r#"
            [database]
            url = "postgres://localhost/coursework"

            [git]
            mailman_remote = "https://git.example.invalid/grading.git"

            [auth]
            bcrypt_cost = 2
            "#,
        );

        let err = ConfigLoader::new()
            .with_config_path(path)
            .with_env_file(dir.path().join("nonexistent.env"))
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigLoadError::GuardRail(ConfigGuardRailError::BcryptCostOutOfRange(2))));
    }
}
