//! Settings loading from disk and environment.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::settings::schema::ServiceSettings;

pub const ENV_BIND: &str = "CONFIGD_BIND";
pub const ENV_CONFIG_DIR: &str = "CONFIGD_CONFIG_DIR";
pub const ENV_API_KEY: &str = "CONFIGD_API_KEY";
pub const ENV_LOG: &str = "CONFIGD_LOG";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid settings: {}", .0.join(", "))]
    Invalid(Vec<String>),
}

/// Load settings from `path` (defaults if `None`), apply environment
/// overrides, then validate.
pub fn load_settings(path: Option<&Path>) -> Result<ServiceSettings, SettingsError> {
    let mut settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => ServiceSettings::default(),
    };

    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    validate_settings(&settings).map_err(SettingsError::Invalid)?;
    Ok(settings)
}

/// Apply environment overrides read through `lookup`.
pub fn apply_overrides<F>(settings: &mut ServiceSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = lookup(ENV_BIND) {
        settings.listener.bind_address = bind;
    }
    if let Some(dir) = lookup(ENV_CONFIG_DIR) {
        settings.storage.config_dir = PathBuf::from(dir);
    }
    if let Some(key) = lookup(ENV_API_KEY) {
        settings.admin.api_key = key;
    }
    if let Some(level) = lookup(ENV_LOG) {
        settings.observability.log_level = level;
    }
}

/// Semantic checks. Returns every problem found, not just the first.
pub fn validate_settings(settings: &ServiceSettings) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if settings.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "listener.bind_address '{}' is not a socket address",
            settings.listener.bind_address
        ));
    }
    if settings.listener.request_timeout_secs == 0 {
        errors.push("listener.request_timeout_secs must be greater than 0".to_string());
    }
    if settings.listener.max_body_bytes == 0 {
        errors.push("listener.max_body_bytes must be greater than 0".to_string());
    }
    if settings.storage.config_dir.as_os_str().is_empty() {
        errors.push("storage.config_dir must not be empty".to_string());
    }
    if settings.observability.metrics_enabled
        && settings.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(format!(
            "observability.metrics_address '{}' is not a socket address",
            settings.observability.metrics_address
        ));
    }
    if settings.lifecycle.restart_exit_code == 0 {
        errors.push("lifecycle.restart_exit_code must be non-zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_settings(&ServiceSettings::default()).is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[admin]\napi_key = \"s3cret\"").unwrap();

        let settings = load_settings(Some(file.path())).unwrap();

        assert_eq!(settings.admin.api_key, "s3cret");
        assert_eq!(settings.lifecycle.restart_exit_code, 4);
    }

    #[test]
    fn test_unparseable_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener\nbind_address = 1").unwrap();

        assert!(matches!(
            load_settings(Some(file.path())),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides_apply() {
        let env = HashMap::from([
            (ENV_BIND, "0.0.0.0:9999"),
            (ENV_CONFIG_DIR, "/var/lib/fx"),
        ]);
        let mut settings = ServiceSettings::default();

        apply_overrides(&mut settings, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(settings.listener.bind_address, "0.0.0.0:9999");
        assert_eq!(settings.storage.config_dir, PathBuf::from("/var/lib/fx"));
        assert_eq!(settings.admin.api_key, "");
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut settings = ServiceSettings::default();
        settings.listener.bind_address = "nowhere".to_string();
        settings.listener.request_timeout_secs = 0;
        settings.lifecycle.restart_exit_code = 0;

        let errors = validate_settings(&settings).unwrap_err();

        assert_eq!(errors.len(), 3);
    }
}
