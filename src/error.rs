//! Errors raised by the configuration engine.

use thiserror::Error;

use crate::config::namespace::Namespace;
use crate::config::validation::ValidationError;
use crate::engine::migration::MigrationError;
use crate::storage::{BackupReason, StorageError};

/// Why a configuration operation failed.
///
/// Every variant except `Persistence` is raised before live state changes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The submitted document is not a JSON object of the expected shape.
    #[error("malformed configuration: {0}")]
    Malformed(String),

    #[error("Unknown/forbidden {namespace} config key: '{key}'")]
    UnknownKey { namespace: Namespace, key: String },

    #[error("invalid {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to migrate import config to the current version: {0}")]
    Migration(#[from] MigrationError),

    #[error("failed to back up configuration before {reason}: {source}")]
    Backup {
        reason: BackupReason,
        #[source]
        source: StorageError,
    },

    /// The persisted document could not be read at startup.
    #[error("failed to load stored configuration: {source}")]
    Load {
        #[source]
        source: StorageError,
    },

    /// Live state changed but the durable write did not land.
    #[error("configuration applied in memory but not saved: {source}")]
    Persistence {
        #[source]
        source: StorageError,
    },
}

impl ConfigError {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::Malformed(_) => "malformed",
            ConfigError::UnknownKey { .. } => "unknown_key",
            ConfigError::Validation(_) => "validation",
            ConfigError::Migration(_) => "migration",
            ConfigError::Backup { .. } => "backup",
            ConfigError::Load { .. } => "load",
            ConfigError::Persistence { .. } => "persistence",
        }
    }

    /// Rejected input the caller can fix.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConfigError::Malformed(_) | ConfigError::UnknownKey { .. } | ConfigError::Validation(_)
        )
    }

    /// In-memory state and durable storage no longer agree.
    pub fn is_diverged(&self) -> bool {
        matches!(self, ConfigError::Persistence { .. })
    }
}
