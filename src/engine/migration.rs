//! Migration of imported configuration snapshots.
//!
//! # Data Flow
//! ```text
//! imported document
//!     → ConfigVersion::of_document (missing / unparseable = Legacy)
//!     → equal to CONFIGURATION_VERSION: returned untouched
//!     → older: apply the registered step for the current version,
//!       stamp the step's target version, repeat until current
//!     → no step for a version, or a step fails: MigrationError
//! ```
//!
//! # Design Decisions
//! - Steps are small and version-ranged; chaining covers multi-hop upgrades
//! - Documents newer than this build are rejected rather than guessed at

use serde_json::Value;
use thiserror::Error;

use crate::config::namespace::Fragment;
use crate::config::version::{ConfigVersion, VERSION_KEY};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("no migration registered for configuration version {0}")]
    NoPath(ConfigVersion),

    #[error("configuration version {found} is newer than supported version {supported}")]
    Newer {
        found: ConfigVersion,
        supported: ConfigVersion,
    },

    #[error("migration '{step}' failed: {source}")]
    Transform {
        step: String,
        #[source]
        source: BoxError,
    },

    #[error("migration '{step}' did not move the configuration forward")]
    Stalled { step: String },
}

/// Maps a document at an older version to a newer layout.
pub trait MigrationTransform: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this step upgrades documents at `version`.
    fn applies_to(&self, version: &ConfigVersion) -> bool;

    /// Version of the documents this step produces.
    fn target(&self) -> ConfigVersion;

    fn migrate(&self, document: Fragment) -> Result<Fragment, BoxError>;
}

/// Result of a successful migration.
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub document: Fragment,
    pub from: ConfigVersion,
    /// Names of the steps applied, in order.
    pub steps: Vec<String>,
}

pub struct Migrator {
    steps: Vec<Box<dyn MigrationTransform>>,
    current: ConfigVersion,
}

impl Migrator {
    /// Migrator without any registered steps.
    pub fn empty() -> Self {
        Self {
            steps: Vec::new(),
            current: ConfigVersion::current(),
        }
    }

    /// Migrator with the steps shipped in this build.
    pub fn builtin() -> Self {
        Self::empty()
            .with_step(LegacyKeyRenames)
            .with_step(WledPreferenceGroups)
    }

    pub fn with_step(mut self, step: impl MigrationTransform + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn current(&self) -> &ConfigVersion {
        &self.current
    }

    /// Bring `document` forward to the current version.
    pub fn migrate(&self, mut document: Fragment) -> Result<Migrated, MigrationError> {
        let from = ConfigVersion::of_document(&document);
        let mut version = from.clone();
        let mut applied = Vec::new();

        if version > self.current {
            return Err(MigrationError::Newer {
                found: version,
                supported: self.current.clone(),
            });
        }

        while version < self.current {
            let step = self
                .steps
                .iter()
                .find(|s| s.applies_to(&version))
                .ok_or_else(|| MigrationError::NoPath(version.clone()))?;

            let target = step.target();
            if target <= version {
                return Err(MigrationError::Stalled {
                    step: step.name().to_string(),
                });
            }

            document = step.migrate(document).map_err(|source| MigrationError::Transform {
                step: step.name().to_string(),
                source,
            })?;
            document.insert(VERSION_KEY.to_string(), Value::String(target.to_string()));

            tracing::info!(
                step = step.name(),
                from = %version,
                to = %target,
                "Applied configuration migration"
            );
            applied.push(step.name().to_string());
            version = target;
        }

        if version != self.current {
            return Err(MigrationError::Newer {
                found: version,
                supported: self.current.clone(),
            });
        }

        Ok(Migrated {
            document,
            from,
            steps: applied,
        })
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::builtin()
    }
}

fn rename(section: &mut Fragment, from: &str, to: &str) {
    if section.contains_key(to) {
        section.remove(from);
        return;
    }
    if let Some(value) = section.remove(from) {
        section.insert(to.to_string(), value);
    }
}

fn section_mut<'a>(document: &'a mut Fragment, key: &str) -> Result<Option<&'a mut Fragment>, BoxError> {
    match document.get_mut(key) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(format!("legacy '{}' section is not an object", key).into()),
    }
}

/// Untagged and 1.x documents: field renames that predate 2.0.
pub struct LegacyKeyRenames;

impl MigrationTransform for LegacyKeyRenames {
    fn name(&self) -> &str {
        "legacy_key_renames"
    }

    fn applies_to(&self, version: &ConfigVersion) -> bool {
        *version == ConfigVersion::Legacy
            || version.within(&ConfigVersion::parse("1.0"), &ConfigVersion::parse("2.0"))
    }

    fn target(&self) -> ConfigVersion {
        ConfigVersion::parse("2.0")
    }

    fn migrate(&self, mut document: Fragment) -> Result<Fragment, BoxError> {
        rename(&mut document, "brightness", "global_brightness");
        rename(&mut document, "fps", "visualisation_fps");
        rename(&mut document, "visualisation_max_len", "visualisation_maxlen");
        if let Some(audio) = section_mut(&mut document, "audio")? {
            rename(audio, "device_index", "audio_device");
        }
        Ok(document)
    }
}

/// 2.0 documents stored WLED preferences as bare values.
pub struct WledPreferenceGroups;

impl MigrationTransform for WledPreferenceGroups {
    fn name(&self) -> &str {
        "wled_preference_groups"
    }

    fn applies_to(&self, version: &ConfigVersion) -> bool {
        version.within(&ConfigVersion::parse("2.0"), &ConfigVersion::parse("2.1"))
    }

    fn target(&self) -> ConfigVersion {
        ConfigVersion::parse("2.1")
    }

    fn migrate(&self, mut document: Fragment) -> Result<Fragment, BoxError> {
        if let Some(prefs) = section_mut(&mut document, "wled_preferences")? {
            for value in prefs.values_mut() {
                if !value.is_object() {
                    let setting = value.take();
                    let mut group = Fragment::new();
                    group.insert("setting".to_string(), setting);
                    group.insert("user_set".to_string(), Value::Bool(true));
                    *value = Value::Object(group);
                }
            }
        }
        Ok(document)
    }
}
