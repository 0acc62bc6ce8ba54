//! Engine-level behavior over in-memory storage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fx_configd::config::{ConfigVersion, Fragment, LiveConfig, Namespace, SchemaRegistry};
use fx_configd::engine::migration::{BoxError, MigrationTransform, Migrator};
use fx_configd::engine::ConfigEngine;
use fx_configd::storage::{BackupReason, MemoryStorage, StorageOp};
use fx_configd::ConfigError;
use serde_json::{json, Value};

fn fragment(value: Value) -> Fragment {
    value.as_object().cloned().unwrap()
}

/// Engine whose live state is `document`, with storage calls recorded from here on.
fn engine_with(document: Value) -> (ConfigEngine, Arc<MemoryStorage>) {
    let registry = SchemaRegistry::builtin();
    let initial = LiveConfig::from_document(fragment(document), &registry).unwrap();
    let storage = Arc::new(MemoryStorage::with_document(initial.to_document()));
    let engine = ConfigEngine::builder(storage.clone()).build(initial);
    (engine, storage)
}

struct CountingStep(Arc<AtomicUsize>);

impl MigrationTransform for CountingStep {
    fn name(&self) -> &str {
        "counting"
    }
    fn applies_to(&self, _version: &ConfigVersion) -> bool {
        true
    }
    fn target(&self) -> ConfigVersion {
        ConfigVersion::current()
    }
    fn migrate(&self, document: Fragment) -> Result<Fragment, BoxError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(document)
    }
}

#[test]
fn test_update_merges_core_and_nested_preferences() {
    let (engine, _) = engine_with(json!({
        "global_brightness": 0.5,
        "wled_preferences": {"inactivity_timeout": {"setting": 2, "user_set": true}},
    }));

    let outcome = engine
        .apply_update(json!({
            "global_brightness": 0.8,
            "wled_preferences": {"inactivity_timeout": {"setting": 5}},
        }))
        .unwrap();

    let live = engine.snapshot();
    assert_eq!(live.namespace(Namespace::Core)["global_brightness"], json!(0.8));
    assert_eq!(
        live.namespace(Namespace::WledPreferences)["inactivity_timeout"],
        json!({"setting": 5, "user_set": true})
    );
    assert!(outcome.restart_required);
}

#[test]
fn test_failed_namespace_leaves_every_namespace_untouched() {
    let (engine, storage) = engine_with(json!({}));
    let before = engine.snapshot();
    let ops_before = storage.operations().len();

    let err = engine
        .apply_update(json!({
            "audio": {"min_volume": 0.4},
            "melbanks": {"max_frequencies": [300, 200]},
        }))
        .unwrap_err();

    assert!(matches!(err, ConfigError::Validation(ref e) if e.namespace == Namespace::Melbanks));
    assert_eq!(*engine.snapshot(), *before);
    assert_eq!(storage.operations().len(), ops_before);
}

#[test]
fn test_unknown_core_key_is_rejected_with_its_name() {
    let (engine, _) = engine_with(json!({}));

    let err = engine.apply_update(json!({"wallpaper": "blue"})).unwrap_err();

    assert_eq!(err.to_string(), "Unknown/forbidden core config key: 'wallpaper'");
}

#[test]
fn test_import_at_current_version_runs_no_migration() {
    let calls = Arc::new(AtomicUsize::new(0));
    let storage = Arc::new(MemoryStorage::new());
    let engine = ConfigEngine::builder(storage)
        .migrator(Migrator::empty().with_step(CountingStep(calls.clone())))
        .open()
        .unwrap();

    let outcome = engine
        .import_config(json!({"configuration_version": "2.1", "port": 9100}))
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(outcome.migrations.is_empty());
    assert_eq!(engine.snapshot().namespace(Namespace::Core)["port"], json!(9100));
}

#[test]
fn test_import_takes_one_backup_before_replacing() {
    let (engine, storage) = engine_with(json!({"port": 9000}));
    let previous = storage.document();

    engine
        .import_config(json!({"configuration_version": "2.1", "port": 9100}))
        .unwrap();

    assert_eq!(
        storage.operations(),
        vec![StorageOp::Backup(BackupReason::Import), StorageOp::Save]
    );
    assert_eq!(storage.backups(), vec![(BackupReason::Import, previous)]);
}

#[test]
fn test_reset_takes_one_backup_before_replacing() {
    let (engine, storage) = engine_with(json!({"port": 9000}));
    let previous = storage.document();

    engine.reset_to_defaults().unwrap();

    assert_eq!(
        storage.operations(),
        vec![StorageOp::Backup(BackupReason::Delete), StorageOp::Save]
    );
    assert_eq!(storage.backups(), vec![(BackupReason::Delete, previous)]);
    assert_eq!(engine.snapshot().namespace(Namespace::Core)["port"], json!(8888));
}

#[test]
fn test_import_without_migration_path_changes_nothing() {
    let (engine, storage) = engine_with(json!({"port": 9000}));
    let before = engine.snapshot();

    let err = engine
        .import_config(json!({"configuration_version": "0.9", "port": 1}))
        .unwrap_err();

    assert!(matches!(err, ConfigError::Migration(_)));
    assert!(storage.backups().is_empty());
    assert!(storage.operations().is_empty());
    assert_eq!(*engine.snapshot(), *before);
}

#[test]
fn test_legacy_import_is_migrated() {
    let (engine, _) = engine_with(json!({}));

    let outcome = engine
        .import_config(json!({"brightness": 0.3, "audio": {"device_index": 1}}))
        .unwrap();

    assert_eq!(outcome.from_version, ConfigVersion::Legacy);
    assert_eq!(outcome.migrations, vec!["legacy_key_renames", "wled_preference_groups"]);
    let live = engine.snapshot();
    assert_eq!(live.namespace(Namespace::Core)["global_brightness"], json!(0.3));
    assert_eq!(live.namespace(Namespace::Audio)["audio_device"], json!(1));
}

#[test]
fn test_needs_restart_classification_table() {
    let (engine, _) = engine_with(json!({}));
    let cases = [
        (json!({"visualisation_fps": 30, "scan_on_startup": true}), false),
        (json!({"visualisation_fps": 30, "host": "127.0.0.1"}), false),
        (json!({}), false),
        (json!({"host": "127.0.0.1"}), true),
    ];

    for (core, expected) in cases {
        assert_eq!(
            engine.needs_restart(&fragment(core.clone())).unwrap(),
            expected,
            "{core}"
        );
    }
}

#[test]
fn test_user_presets_accepted_in_every_namespace() {
    let (engine, _) = engine_with(json!({}));

    let outcome = engine
        .apply_update(json!({
            "user_presets": {"rainbow": {"speed": 2}},
            "audio": {"user_presets": {}},
        }))
        .unwrap();

    assert!(!outcome.restart_required);
    assert_eq!(
        engine.snapshot().namespace(Namespace::Core)["user_presets"],
        json!({"rainbow": {"speed": 2}})
    );
    assert!(!engine.snapshot().namespace(Namespace::Audio).contains_key("user_presets"));
}
