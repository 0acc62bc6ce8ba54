//! File-backed configuration storage.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use uuid::Uuid;

use crate::config::namespace::Fragment;
use crate::storage::{BackupReason, ConfigStorage, StorageError};

/// Name of the persisted configuration inside the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Subdirectory holding backups.
pub const BACKUP_DIR: &str = "backups";

/// Stores `config.json` in a directory, with backups under `backups/`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.join(BACKUP_DIR)
    }

    fn backup_path(&self, reason: BackupReason) -> PathBuf {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let suffix = Uuid::new_v4().simple().to_string();
        self.backup_dir().join(format!(
            "config_{}_{}_{}.json",
            reason.as_str(),
            secs,
            &suffix[..8]
        ))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ConfigStorage for FileStorage {
    fn load(&self) -> Result<Option<Fragment>, StorageError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(io_error(&path))?;
        let value: Value = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            StorageError::Decode {
                path: path.clone(),
                source,
            }
        })?;

        match value {
            Value::Object(document) => {
                tracing::info!(path = %path.display(), "Loaded configuration file");
                Ok(Some(document))
            }
            _ => Err(StorageError::NotAnObject { path }),
        }
    }

    fn save(&self, document: &Fragment) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;

        let path = self.config_path();
        let tmp = self.dir.join(format!("{}.tmp", CONFIG_FILE));
        {
            let file = File::create(&tmp).map_err(io_error(&tmp))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, document).map_err(StorageError::Encode)?;
            writer.flush().map_err(io_error(&tmp))?;
            writer.get_ref().sync_all().map_err(io_error(&tmp))?;
        }
        fs::rename(&tmp, &path).map_err(io_error(&path))?;

        tracing::debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    fn backup(&self, reason: BackupReason) -> Result<(), StorageError> {
        let source = self.config_path();
        if !source.exists() {
            tracing::info!(reason = %reason, "No configuration file to back up");
            return Ok(());
        }

        let dir = self.backup_dir();
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        let target = self.backup_path(reason);
        fs::copy(&source, &target).map_err(io_error(&target))?;

        tracing::info!(
            reason = %reason,
            path = %target.display(),
            "Configuration backed up"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));
        let document = json!({"port": 8888, "audio": {"min_volume": 0.3}});

        storage.save(document.as_object().unwrap()).unwrap();

        assert_eq!(storage.load().unwrap().unwrap(), *document.as_object().unwrap());
        assert!(!storage.dir().join("config.json.tmp").exists());
    }

    #[test]
    fn test_backup_copies_current_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.save(json!({"port": 1234}).as_object().unwrap()).unwrap();

        storage.backup(BackupReason::Import).unwrap();

        let backups: Vec<_> = fs::read_dir(storage.backup_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].starts_with("config_IMPORT_"));
    }

    #[test]
    fn test_backup_without_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.backup(BackupReason::Delete).unwrap();

        assert!(!storage.backup_dir().exists());
    }

    #[test]
    fn test_load_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[1, 2]").unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(matches!(storage.load(), Err(StorageError::NotAnObject { .. })));
    }
}
