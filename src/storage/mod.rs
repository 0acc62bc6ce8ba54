//! Durable storage for the live configuration.
//!
//! # Responsibilities
//! - Load the persisted document at startup
//! - Persist the full document after every committed mutation
//! - Take reason-tagged backups before destructive replaces
//!
//! # Design Decisions
//! - Storage is a trait so the engine can be exercised without a disk
//! - Failures are returned, never swallowed; the engine decides severity

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::namespace::Fragment;

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::{MemoryStorage, StorageOp};

/// Why a backup was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupReason {
    /// A full configuration import is about to replace live state.
    Import,
    /// Live state is about to be reset to defaults.
    Delete,
}

impl BackupReason {
    /// Tag used in backup file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupReason::Import => "IMPORT",
            BackupReason::Delete => "DELETE",
        }
    }
}

impl fmt::Display for BackupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupReason::Import => f.write_str("import"),
            BackupReason::Delete => f.write_str("reset"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode configuration: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} does not contain a JSON object", path.display())]
    NotAnObject { path: PathBuf },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Where the live configuration is persisted.
pub trait ConfigStorage: Send + Sync {
    /// Read the persisted document, if one exists.
    fn load(&self) -> Result<Option<Fragment>, StorageError>;

    /// Durably replace the persisted document.
    fn save(&self, document: &Fragment) -> Result<(), StorageError>;

    /// Snapshot the currently persisted document. Must complete before the
    /// caller replaces it.
    fn backup(&self, reason: BackupReason) -> Result<(), StorageError>;
}
