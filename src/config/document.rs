//! The live configuration document.

use serde_json::Value;

use crate::config::namespace::{Fragment, Namespace};
use crate::config::registry::SchemaRegistry;
use crate::config::version::{CONFIGURATION_VERSION, VERSION_KEY};
use crate::error::ConfigError;

/// Complete namespaced configuration.
///
/// Persisted flat: core keys at the top level, each nested namespace as an
/// object under its own name, plus `configuration_version`.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    core: Fragment,
    audio: Fragment,
    melbanks: Fragment,
    wled_preferences: Fragment,
    version: String,
}

impl LiveConfig {
    /// Every namespace at its schema defaults.
    pub fn defaults(registry: &SchemaRegistry) -> Self {
        Self {
            core: registry.entry(Namespace::Core).defaults(),
            audio: registry.entry(Namespace::Audio).defaults(),
            melbanks: registry.entry(Namespace::Melbanks).defaults(),
            wled_preferences: registry.entry(Namespace::WledPreferences).defaults(),
            version: CONFIGURATION_VERSION.to_string(),
        }
    }

    /// Build from a full document at the current version.
    ///
    /// Each namespace is validated untrimmed: missing fields are defaulted,
    /// not rejected. The caller is responsible for migrating the document first.
    pub fn from_document(mut document: Fragment, registry: &SchemaRegistry) -> Result<Self, ConfigError> {
        document.remove(VERSION_KEY);

        let mut nested = |ns: Namespace| -> Result<Fragment, ConfigError> {
            let raw = match document.remove(ns.as_str()) {
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
            Ok(registry.entry(ns).apply(&raw)?)
        };

        let audio = nested(Namespace::Audio)?;
        let wled_preferences = nested(Namespace::WledPreferences)?;
        let melbanks = nested(Namespace::Melbanks)?;
        let core = registry.entry(Namespace::Core).apply(&document)?;

        Ok(Self {
            core,
            audio,
            melbanks,
            wled_preferences,
            version: CONFIGURATION_VERSION.to_string(),
        })
    }

    /// Flat document for persistence.
    pub fn to_document(&self) -> Fragment {
        let mut document = self.core.clone();
        for ns in Namespace::NESTED {
            document.insert(ns.as_str().to_string(), Value::Object(self.namespace(ns).clone()));
        }
        document.insert(VERSION_KEY.to_string(), Value::String(self.version.clone()));
        document
    }

    /// Stored fragment for a namespace.
    pub fn namespace(&self, namespace: Namespace) -> &Fragment {
        match namespace {
            Namespace::Core => &self.core,
            Namespace::Audio => &self.audio,
            Namespace::Melbanks => &self.melbanks,
            Namespace::WledPreferences => &self.wled_preferences,
        }
    }

    pub(crate) fn namespace_mut(&mut self, namespace: Namespace) -> &mut Fragment {
        match namespace {
            Namespace::Core => &mut self.core,
            Namespace::Audio => &mut self.audio,
            Namespace::Melbanks => &mut self.melbanks,
            Namespace::WledPreferences => &mut self.wled_preferences,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_round_trip_through_document() {
        let registry = SchemaRegistry::builtin();
        let defaults = LiveConfig::defaults(&registry);

        let restored = LiveConfig::from_document(defaults.to_document(), &registry).unwrap();

        assert_eq!(restored, defaults);
    }

    #[test]
    fn test_document_layout_is_flat() {
        let registry = SchemaRegistry::builtin();
        let document = LiveConfig::defaults(&registry).to_document();

        assert_eq!(document[VERSION_KEY], json!(CONFIGURATION_VERSION));
        assert!(document["audio"].is_object());
        assert!(document["wled_preferences"].is_object());
        assert_eq!(document["port"], json!(8888));
    }

    #[test]
    fn test_from_document_fills_missing_fields() {
        let registry = SchemaRegistry::builtin();
        let document = json!({
            "global_brightness": 0.3,
            "audio": {"min_volume": 0.5},
        });

        let config =
            LiveConfig::from_document(document.as_object().cloned().unwrap(), &registry).unwrap();

        assert_eq!(config.namespace(Namespace::Core)["global_brightness"], json!(0.3));
        assert_eq!(config.namespace(Namespace::Core)["port"], json!(8888));
        assert_eq!(config.namespace(Namespace::Audio)["min_volume"], json!(0.5));
        assert_eq!(config.namespace(Namespace::Audio)["mic_rate"], json!(44100));
        assert!(config.namespace(Namespace::WledPreferences).is_empty());
    }

    #[test]
    fn test_from_document_rejects_non_object_namespace() {
        let registry = SchemaRegistry::builtin();
        let document = json!({"melbanks": [1, 2, 3]});

        let err = LiveConfig::from_document(document.as_object().cloned().unwrap(), &registry)
            .unwrap_err();

        assert!(matches!(err, ConfigError::Malformed(_)));
    }
}
