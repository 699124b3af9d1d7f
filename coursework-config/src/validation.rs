use thiserror::Error;

use crate::models::Config;

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push(&mut self, message: impl Into<String>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint(&mut self, message: impl Into<String>, hint: impl Into<String>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("session_ttl_secs must be positive, got {0}")]
    NonPositiveSessionTtl(i64),
    #[error("bcrypt_cost must be between 4 and 31, got {0}")]
    BcryptCostOutOfRange(u32),
    #[error("reload_signal and trigger_signal must differ (both {0})")]
    SignalCollision(i32),
}

/// Non-structural checks that `Deserialize` can't express: positivity,
/// ranges, cross-field consistency. Returns accumulated warnings for
/// conditions that are suspicious but not fatal.
pub fn apply_guard_rails(config: &Config) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.auth.session_ttl_secs <= 0 {
        return Err(ConfigGuardRailError::NonPositiveSessionTtl(
            config.auth.session_ttl_secs,
        ));
    }

    if !(4..=31).contains(&config.auth.bcrypt_cost) {
        return Err(ConfigGuardRailError::BcryptCostOutOfRange(config.auth.bcrypt_cost));
    }

    if config.orchestrator.reload_signal == config.orchestrator.trigger_signal {
        return Err(ConfigGuardRailError::SignalCollision(config.orchestrator.reload_signal));
    }

    if config.auth.bcrypt_cost < 10 {
        warnings.push_with_hint(
            format!("bcrypt_cost {} is below the recommended floor of 10", config.auth.bcrypt_cost),
            "raise auth.bcrypt_cost in the config file for production deployments",
        );
    }

    if config.git.mailman_remote == config.git.denis_remote {
        warnings.push("git.mailman_remote and git.denis_remote point at the same URL");
    }

    Ok(warnings)
}
