//! Schema registry: namespace to schema and allow-list.

use crate::config::namespace::{Fragment, Namespace};
use crate::config::schema::{self, AudioConfig, CoreConfig, MelbanksConfig, NamespaceSchema, WledPreferences};
use crate::config::validation::ValidationError;

/// Key accepted in every namespace regardless of its allow-list.
pub const CROSS_CUTTING_KEY: &str = "user_presets";

/// Schema and permitted keys for a single namespace.
#[derive(Clone, Copy)]
pub struct SchemaEntry {
    namespace: Namespace,
    fields: &'static [&'static str],
    permitted: &'static [&'static str],
    apply: fn(&Fragment) -> Result<Fragment, ValidationError>,
    defaults: fn() -> Fragment,
}

impl SchemaEntry {
    fn of<S: NamespaceSchema>() -> Self {
        Self {
            namespace: S::NAMESPACE,
            fields: S::FIELDS,
            permitted: S::PERMITTED,
            apply: schema::apply::<S>,
            defaults: schema::defaults::<S>,
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Whether a caller may submit `key` in a partial update.
    pub fn is_permitted(&self, key: &str) -> bool {
        self.permitted.contains(&key)
    }

    /// Whether the schema declares `key` at all.
    pub fn declares(&self, key: &str) -> bool {
        self.fields.contains(&key)
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Validate a fragment, returning it fully defaulted.
    pub fn apply(&self, fragment: &Fragment) -> Result<Fragment, ValidationError> {
        (self.apply)(fragment)
    }

    pub fn defaults(&self) -> Fragment {
        (self.defaults)()
    }
}

impl std::fmt::Debug for SchemaEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaEntry")
            .field("namespace", &self.namespace)
            .field("permitted", &self.permitted)
            .finish()
    }
}

/// Lookup table for every namespace's schema.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    core: SchemaEntry,
    audio: SchemaEntry,
    melbanks: SchemaEntry,
    wled_preferences: SchemaEntry,
}

impl SchemaRegistry {
    /// Registry with the compiled-in schemas.
    pub fn builtin() -> Self {
        Self {
            core: SchemaEntry::of::<CoreConfig>(),
            audio: SchemaEntry::of::<AudioConfig>(),
            melbanks: SchemaEntry::of::<MelbanksConfig>(),
            wled_preferences: SchemaEntry::of::<WledPreferences>(),
        }
    }

    pub fn entry(&self, namespace: Namespace) -> &SchemaEntry {
        match namespace {
            Namespace::Core => &self.core,
            Namespace::Audio => &self.audio,
            Namespace::Melbanks => &self.melbanks,
            Namespace::WledPreferences => &self.wled_preferences,
        }
    }

    /// Top-level keys a reader may ask for: core fields plus nested namespaces.
    pub fn projectable_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.core
            .fields()
            .iter()
            .copied()
            .chain(Namespace::NESTED.into_iter().map(|ns| ns.as_str()))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_match_their_namespace() {
        let registry = SchemaRegistry::builtin();
        for ns in Namespace::ALL {
            assert_eq!(registry.entry(ns).namespace(), ns);
        }
    }

    #[test]
    fn test_cross_cutting_key_is_not_on_allow_lists() {
        let registry = SchemaRegistry::builtin();
        for ns in Namespace::ALL {
            assert!(!registry.entry(ns).is_permitted(CROSS_CUTTING_KEY));
        }
        assert!(registry.entry(Namespace::Core).declares(CROSS_CUTTING_KEY));
    }

    #[test]
    fn test_projectable_keys_include_nested_namespaces() {
        let registry = SchemaRegistry::builtin();
        let keys: Vec<_> = registry.projectable_keys().collect();
        assert!(keys.contains(&"audio"));
        assert!(keys.contains(&"wled_preferences"));
        assert!(keys.contains(&"global_brightness"));
    }
}
