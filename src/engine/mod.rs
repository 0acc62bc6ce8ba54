//! Configuration mutation engine.
//!
//! # Data Flow
//! ```text
//! apply_update(raw):
//!     → merge::UpdatePlan::prepare (validate every namespace, no mutation)
//!     → merge::apply_plan on a copy of LiveConfig
//!     → publish the copy (readers switch atomically)
//!     → notify::Notifiers for each non-empty namespace
//!     → storage.save
//!     → restart::RestartPolicy decides on restart
//!
//! import_config(raw) / reset_to_defaults():
//!     → migration::Migrator (import only)
//!     → LiveConfig::from_document / LiveConfig::defaults
//!     → storage.backup → publish → storage.save → restart required
//! ```
//!
//! # Design Decisions
//! - One writer at a time; the write lock spans validate → persist
//! - The engine never restarts the process; it reports that a restart is
//!   needed and the transport schedules it after replying

pub mod merge;
pub mod migration;
pub mod notify;
pub mod projection;
pub mod restart;
pub mod store;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::document::{json_kind, LiveConfig};
use crate::config::namespace::{Fragment, Namespace};
use crate::config::registry::SchemaRegistry;
use crate::config::validation;
use crate::config::version::{ConfigVersion, CONFIGURATION_VERSION};
use crate::error::ConfigError;
use crate::observability::metrics;
use crate::storage::{BackupReason, ConfigStorage};

use self::merge::{ChangeSet, UpdatePlan};
use self::migration::Migrator;
use self::notify::{ChangeNotifier, ConfigChange, ConfigEvent, Notifiers};
use self::projection::ProjectionRequest;
use self::restart::RestartPolicy;
use self::store::LiveConfigStore;

/// Result of a partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Namespaces whose live value changed.
    pub changed: ChangeSet,
    pub restart_required: bool,
}

/// Result of a full import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    /// Version tag the imported document carried.
    pub from_version: ConfigVersion,
    /// Migration steps applied, in order.
    pub migrations: Vec<String>,
}

pub struct ConfigEngineBuilder {
    storage: Arc<dyn ConfigStorage>,
    registry: SchemaRegistry,
    restart_policy: RestartPolicy,
    migrator: Migrator,
    notifiers: Notifiers,
}

impl ConfigEngineBuilder {
    pub fn migrator(mut self, migrator: Migrator) -> Self {
        self.migrator = migrator;
        self
    }

    pub fn restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    pub fn notifier(mut self, namespace: Namespace, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifiers.register(namespace, notifier);
        self
    }

    /// Load the persisted configuration, or write defaults if there is none.
    ///
    /// An older persisted document is migrated and saved back.
    pub fn open(self) -> Result<ConfigEngine, ConfigError> {
        let loaded = self
            .storage
            .load()
            .map_err(|source| ConfigError::Load { source })?;

        let (initial, needs_save) = match loaded {
            None => {
                tracing::warn!("No stored configuration found, using defaults");
                (LiveConfig::defaults(&self.registry), true)
            }
            Some(document) => {
                let version = ConfigVersion::of_document(&document);
                if version.is_current() {
                    (LiveConfig::from_document(document, &self.registry)?, false)
                } else {
                    tracing::warn!(
                        current = CONFIGURATION_VERSION,
                        stored = %version,
                        "Stored configuration is out of date, migrating"
                    );
                    let migrated = self.migrator.migrate(document)?;
                    (LiveConfig::from_document(migrated.document, &self.registry)?, true)
                }
            }
        };

        if needs_save {
            self.storage
                .save(&initial.to_document())
                .map_err(|source| ConfigError::Persistence { source })?;
        }

        Ok(self.build(initial))
    }

    /// Start from `initial` without touching storage.
    pub fn build(self, initial: LiveConfig) -> ConfigEngine {
        ConfigEngine {
            store: LiveConfigStore::new(initial),
            storage: self.storage,
            registry: self.registry,
            restart_policy: self.restart_policy,
            migrator: self.migrator,
            notifiers: self.notifiers,
        }
    }
}

/// Sole writer of the live configuration.
pub struct ConfigEngine {
    store: LiveConfigStore,
    storage: Arc<dyn ConfigStorage>,
    registry: SchemaRegistry,
    restart_policy: RestartPolicy,
    migrator: Migrator,
    notifiers: Notifiers,
}

impl ConfigEngine {
    pub fn builder(storage: Arc<dyn ConfigStorage>) -> ConfigEngineBuilder {
        ConfigEngineBuilder {
            storage,
            registry: SchemaRegistry::builtin(),
            restart_policy: RestartPolicy::builtin(),
            migrator: Migrator::builtin(),
            notifiers: Notifiers::new(),
        }
    }

    /// Current configuration.
    pub fn snapshot(&self) -> Arc<LiveConfig> {
        self.store.snapshot()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.notifiers.subscribe()
    }

    pub fn validate_and_trim(&self, fragment: &Fragment, namespace: Namespace) -> Result<Fragment, ConfigError> {
        validation::validate_and_trim(fragment, namespace, &self.registry)
    }

    pub fn needs_restart(&self, raw_core: &Fragment) -> Result<bool, ConfigError> {
        self.restart_policy.needs_restart(raw_core, &self.registry)
    }

    /// Project the live configuration for readers.
    pub fn project(&self, request: &ProjectionRequest) -> Fragment {
        projection::project(&self.snapshot(), &self.registry, request)
    }

    /// Validate and merge a partial update.
    ///
    /// Either every namespace is applied or none is.
    pub fn apply_update(&self, raw: Value) -> Result<UpdateOutcome, ConfigError> {
        let result = self.try_apply_update(raw);
        metrics::record_update(result.as_ref().map(|_| ()));
        result
    }

    fn try_apply_update(&self, raw: Value) -> Result<UpdateOutcome, ConfigError> {
        let raw = into_object(raw)?;
        let tx = self.store.begin();

        let plan = UpdatePlan::prepare(raw, &self.registry).inspect_err(|e| {
            tracing::warn!(kind = e.kind(), error = %e, "Configuration update rejected");
        })?;

        let mut next = (*tx.current()).clone();
        let changed = merge::apply_plan(&mut next, &plan);
        let committed = tx.publish(next);

        for (ns, fragment) in plan.iter() {
            self.notifiers.dispatch(ConfigChange {
                namespace: ns,
                changed: fragment.clone(),
                current: committed.namespace(ns).clone(),
            });
        }
        if let Some(core) = plan.fragment(Namespace::Core) {
            self.notifiers.emit(ConfigEvent::CoreUpdated {
                keys: core.keys().cloned().collect(),
            });
        }

        self.persist(&committed)?;

        let restart_required = plan
            .fragment(Namespace::Core)
            .is_some_and(|core| self.restart_policy.classify(core));

        tracing::info!(
            changed = ?changed,
            restart_required,
            "Configuration updated"
        );
        Ok(UpdateOutcome {
            changed,
            restart_required,
        })
    }

    /// Replace the live configuration with an imported snapshot.
    ///
    /// Always requires a restart on success.
    pub fn import_config(&self, raw: Value) -> Result<ImportOutcome, ConfigError> {
        let result = self.try_import_config(raw);
        metrics::record_import(result.as_ref().map(|_| ()));
        result
    }

    fn try_import_config(&self, raw: Value) -> Result<ImportOutcome, ConfigError> {
        let raw = into_object(raw)?;
        let tx = self.store.begin();

        let from_version = ConfigVersion::of_document(&raw);
        let (document, migrations) = if from_version.is_current() {
            (raw, Vec::new())
        } else {
            tracing::warn!(
                current = CONFIGURATION_VERSION,
                import = %from_version,
                "Import config version differs, migrating"
            );
            let migrated = self.migrator.migrate(raw).inspect_err(|e| {
                tracing::error!(error = %e, "Failed to migrate import config");
            })?;
            (migrated.document, migrated.steps)
        };

        let normalized = LiveConfig::from_document(document, &self.registry).inspect_err(|e| {
            tracing::warn!(kind = e.kind(), error = %e, "Import config rejected");
        })?;

        self.backup(BackupReason::Import)?;
        let committed = tx.publish(normalized);
        self.notifiers.emit(ConfigEvent::Replaced {
            reason: BackupReason::Import,
        });
        self.persist(&committed)?;

        tracing::info!(from = %from_version, "Configuration imported");
        Ok(ImportOutcome {
            from_version,
            migrations,
        })
    }

    /// Reset every namespace to its schema defaults.
    ///
    /// Always requires a restart on success.
    pub fn reset_to_defaults(&self) -> Result<(), ConfigError> {
        let tx = self.store.begin();

        self.backup(BackupReason::Delete)?;
        let committed = tx.publish(LiveConfig::defaults(&self.registry));
        self.notifiers.emit(ConfigEvent::Replaced {
            reason: BackupReason::Delete,
        });
        self.persist(&committed)?;

        metrics::record_reset();
        tracing::info!("Configuration reset to defaults");
        Ok(())
    }

    fn backup(&self, reason: BackupReason) -> Result<(), ConfigError> {
        self.storage.backup(reason).map_err(|source| {
            tracing::error!(reason = %reason, error = %source, "Backup failed, aborting");
            ConfigError::Backup { reason, source }
        })?;
        metrics::record_backup(reason);
        Ok(())
    }

    fn persist(&self, config: &LiveConfig) -> Result<(), ConfigError> {
        self.storage.save(&config.to_document()).map_err(|source| {
            tracing::error!(
                error = %source,
                "Configuration changed in memory but could not be saved"
            );
            ConfigError::Persistence { source }
        })
    }
}

fn into_object(raw: Value) -> Result<Fragment, ConfigError> {
    match raw {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::Malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}
