//! Settings schema definitions.
//!
//! Every section and field is defaulted so an empty file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings for the configuration daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceSettings {
    pub listener: ListenerSettings,
    pub storage: StorageSettings,
    pub admin: AdminSettings,
    pub observability: ObservabilitySettings,
    pub lifecycle: LifecycleSettings,
}

/// HTTP listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerSettings {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8888".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding `config.json` and `backups/`.
    pub config_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(".fx-configd"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AdminSettings {
    /// Bearer token required on `/api/config`. Empty disables auth.
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    pub log_level: String,

    /// Emit JSON lines instead of the pretty format.
    pub json_logs: bool,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LifecycleSettings {
    /// Exit code reported when the process stops to apply new configuration.
    pub restart_exit_code: i32,

    /// How long in-flight requests may drain after shutdown starts.
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            restart_exit_code: 4,
            shutdown_grace_secs: 10,
        }
    }
}
