//! In-memory storage, for embedding and tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::namespace::Fragment;
use crate::storage::{BackupReason, ConfigStorage, StorageError};

/// A storage call, in the order it was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Load,
    Save,
    Backup(BackupReason),
}

#[derive(Debug, Default)]
struct State {
    document: Option<Fragment>,
    backups: Vec<(BackupReason, Option<Fragment>)>,
    operations: Vec<StorageOp>,
    fail_saves: bool,
    fail_backups: bool,
}

/// Keeps the persisted document in memory and records every call.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Fragment) -> Self {
        let storage = Self::new();
        storage.state().document = Some(document);
        storage
    }

    /// Make subsequent saves fail.
    pub fn fail_saves(&self, fail: bool) {
        self.state().fail_saves = fail;
    }

    /// Make subsequent backups fail.
    pub fn fail_backups(&self, fail: bool) {
        self.state().fail_backups = fail;
    }

    pub fn document(&self) -> Option<Fragment> {
        self.state().document.clone()
    }

    /// Backups taken so far, with the document each one captured.
    pub fn backups(&self) -> Vec<(BackupReason, Option<Fragment>)> {
        self.state().backups.clone()
    }

    pub fn operations(&self) -> Vec<StorageOp> {
        self.state().operations.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Fragment>, StorageError> {
        let mut state = self.state();
        state.operations.push(StorageOp::Load);
        Ok(state.document.clone())
    }

    fn save(&self, document: &Fragment) -> Result<(), StorageError> {
        let mut state = self.state();
        state.operations.push(StorageOp::Save);
        if state.fail_saves {
            return Err(StorageError::Unavailable("save rejected".to_string()));
        }
        state.document = Some(document.clone());
        Ok(())
    }

    fn backup(&self, reason: BackupReason) -> Result<(), StorageError> {
        let mut state = self.state();
        state.operations.push(StorageOp::Backup(reason));
        if state.fail_backups {
            return Err(StorageError::Unavailable("backup rejected".to_string()));
        }
        let snapshot = state.document.clone();
        state.backups.push((reason, snapshot));
        Ok(())
    }
}
