//! Merge engine.
//!
//! # Data Flow
//! ```text
//! raw update (flat JSON object)
//!     → split_update: audio / melbanks / wled_preferences sub-objects,
//!       everything else is core
//!     → UpdatePlan::prepare: validate_and_trim every namespace
//!       (first failure aborts, nothing has been touched yet)
//!     → apply_plan: merge each validated fragment into a copy of LiveConfig
//! ```
//!
//! # Merge Policies
//! - `core`, `audio`, `melbanks`: shallow, each key overwrites
//! - `wled_preferences`: two-level, nested objects are merged key by key

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::config::document::{json_kind, LiveConfig};
use crate::config::namespace::{Fragment, Namespace};
use crate::config::registry::SchemaRegistry;
use crate::config::validation::validate_and_trim;
use crate::error::ConfigError;

/// Namespaces whose live value changed.
pub type ChangeSet = BTreeSet<Namespace>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Each key replaces the live key.
    Shallow,
    /// Object values are merged one level down; anything else replaces.
    TwoLevel,
}

impl MergePolicy {
    pub fn for_namespace(namespace: Namespace) -> Self {
        match namespace {
            Namespace::WledPreferences => MergePolicy::TwoLevel,
            Namespace::Core | Namespace::Audio | Namespace::Melbanks => MergePolicy::Shallow,
        }
    }
}

/// Split a flat update into per-namespace fragments.
pub fn split_update(mut raw: Fragment) -> Result<BTreeMap<Namespace, Fragment>, ConfigError> {
    let mut parts = BTreeMap::new();
    for ns in Namespace::NESTED {
        let fragment = match raw.remove(ns.as_str()) {
            None | Some(Value::Null) => Fragment::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ConfigError::Malformed(format!(
                    "'{}' must be an object, got {}",
                    ns,
                    json_kind(&other)
                )))
            }
        };
        parts.insert(ns, fragment);
    }
    parts.insert(Namespace::Core, raw);
    Ok(parts)
}

/// Validated fragments for every namespace of one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePlan {
    fragments: BTreeMap<Namespace, Fragment>,
}

impl UpdatePlan {
    /// Validate every namespace of `raw`. Fails on the first rejection.
    pub fn prepare(raw: Fragment, registry: &SchemaRegistry) -> Result<Self, ConfigError> {
        let parts = split_update(raw)?;
        let mut fragments = BTreeMap::new();

        for ns in Namespace::ALL {
            let Some(fragment) = parts.get(&ns) else {
                continue;
            };
            let trimmed = validate_and_trim(fragment, ns, registry)?;
            if !trimmed.is_empty() {
                fragments.insert(ns, trimmed);
            }
        }

        Ok(Self { fragments })
    }

    /// Validated fragment for a namespace, if it has any keys.
    pub fn fragment(&self, namespace: Namespace) -> Option<&Fragment> {
        self.fragments.get(&namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Namespace, &Fragment)> {
        self.fragments.iter().map(|(ns, f)| (*ns, f))
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Merge a validated fragment into a live namespace.
pub fn merge_into(target: &mut Fragment, fragment: &Fragment, policy: MergePolicy) {
    for (key, value) in fragment {
        match (policy, target.get_mut(key), value) {
            (MergePolicy::TwoLevel, Some(Value::Object(existing)), Value::Object(incoming)) => {
                for (nested_key, nested_value) in incoming {
                    existing.insert(nested_key.clone(), nested_value.clone());
                }
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Apply a plan to `config`, returning the namespaces that changed.
pub fn apply_plan(config: &mut LiveConfig, plan: &UpdatePlan) -> ChangeSet {
    let mut changed = ChangeSet::new();
    for (ns, fragment) in plan.iter() {
        let target = config.namespace_mut(ns);
        let before = target.clone();
        merge_into(target, fragment, MergePolicy::for_namespace(ns));
        if *target != before {
            changed.insert(ns);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment(value: Value) -> Fragment {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_split_routes_nested_namespaces() {
        let parts = split_update(fragment(json!({
            "global_brightness": 0.8,
            "audio": {"min_volume": 0.1},
        })))
        .unwrap();

        assert_eq!(parts[&Namespace::Core], fragment(json!({"global_brightness": 0.8})));
        assert_eq!(parts[&Namespace::Audio], fragment(json!({"min_volume": 0.1})));
        assert!(parts[&Namespace::Melbanks].is_empty());
    }

    #[test]
    fn test_split_rejects_non_object_namespace() {
        let err = split_update(fragment(json!({"audio": "loud"}))).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_plan_fails_when_any_namespace_fails() {
        let registry = SchemaRegistry::builtin();
        let raw = fragment(json!({
            "global_brightness": 0.5,
            "melbanks": {"min_frequency": 5},
        }));

        let err = UpdatePlan::prepare(raw, &registry).unwrap_err();

        match err {
            ConfigError::Validation(e) => assert_eq!(e.namespace, Namespace::Melbanks),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plan_skips_empty_namespaces() {
        let registry = SchemaRegistry::builtin();
        let plan = UpdatePlan::prepare(fragment(json!({"audio": {}})), &registry).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_shallow_merge_overwrites_keys() {
        let mut live = fragment(json!({"min_volume": 0.2, "delay_ms": 0}));

        merge_into(&mut live, &fragment(json!({"delay_ms": 40})), MergePolicy::Shallow);

        assert_eq!(live, fragment(json!({"min_volume": 0.2, "delay_ms": 40})));
    }

    #[test]
    fn test_shallow_merge_replaces_nested_objects() {
        let mut live = fragment(json!({"user_presets": {"a": 1}}));

        merge_into(&mut live, &fragment(json!({"user_presets": {"b": 2}})), MergePolicy::Shallow);

        assert_eq!(live, fragment(json!({"user_presets": {"b": 2}})));
    }

    #[test]
    fn test_two_level_merge_preserves_sibling_keys() {
        let mut live = fragment(json!({
            "inactivity_timeout": {"setting": 2, "user_set": true}
        }));

        merge_into(
            &mut live,
            &fragment(json!({"inactivity_timeout": {"setting": 5}})),
            MergePolicy::TwoLevel,
        );

        assert_eq!(
            live,
            fragment(json!({"inactivity_timeout": {"setting": 5, "user_set": true}}))
        );
    }

    #[test]
    fn test_two_level_merge_adds_new_top_level_keys() {
        let mut live = fragment(json!({"inactivity_timeout": {"setting": 2}}));

        merge_into(
            &mut live,
            &fragment(json!({"force_max_brightness": {"setting": true}})),
            MergePolicy::TwoLevel,
        );

        assert_eq!(live["force_max_brightness"], json!({"setting": true}));
        assert_eq!(live["inactivity_timeout"], json!({"setting": 2}));
    }

    #[test]
    fn test_apply_plan_reports_only_real_changes() {
        let registry = SchemaRegistry::builtin();
        let mut config = LiveConfig::defaults(&registry);
        let plan = UpdatePlan::prepare(
            fragment(json!({
                "port": 8888,
                "audio": {"delay_ms": 15},
            })),
            &registry,
        )
        .unwrap();

        let changed = apply_plan(&mut config, &plan);

        assert_eq!(changed, ChangeSet::from([Namespace::Audio]));
        assert_eq!(config.namespace(Namespace::Audio)["delay_ms"], json!(15));
    }
}
