//! Read path: project live configuration for callers.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::config::document::LiveConfig;
use crate::config::namespace::{Fragment, Namespace};
use crate::config::registry::SchemaRegistry;

/// Which top-level keys a caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionRequest {
    keys: BTreeSet<String>,
}

impl ProjectionRequest {
    /// Everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Accepts a single name or a list of names; anything else asks for all.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(name) => Self::from_names([name.clone()]),
            Value::Array(items) => Self::from_names(
                items.iter().filter_map(|v| v.as_str().map(str::to_string)),
            ),
            _ => Self::all(),
        }
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.keys.extend(names);
    }
}

/// Project `config` according to `request`.
///
/// Unknown names are dropped; if nothing valid remains, every key is
/// returned. Nested namespaces are returned with schema defaults applied.
pub fn project(config: &LiveConfig, registry: &SchemaRegistry, request: &ProjectionRequest) -> Fragment {
    let known: Vec<&'static str> = registry.projectable_keys().collect();
    let mut wanted: Vec<&'static str> = known
        .iter()
        .copied()
        .filter(|key| request.keys.contains(*key))
        .collect();
    if wanted.is_empty() {
        wanted = known;
    }

    let core = config.namespace(Namespace::Core);
    let mut response = Fragment::new();
    for key in wanted {
        let value = match Namespace::from_key(key) {
            Some(ns) => Value::Object(defaulted(config, registry, ns)),
            None => core.get(key).cloned().unwrap_or(Value::Null),
        };
        response.insert(key.to_string(), value);
    }
    response
}

fn defaulted(config: &LiveConfig, registry: &SchemaRegistry, namespace: Namespace) -> Fragment {
    let stored = config.namespace(namespace);
    match registry.entry(namespace).apply(stored) {
        Ok(full) => full,
        Err(e) => {
            tracing::warn!(
                namespace = %namespace,
                error = %e,
                "Stored configuration fails its schema, returning it as stored"
            );
            stored.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn live() -> (LiveConfig, SchemaRegistry) {
        let registry = SchemaRegistry::builtin();
        (LiveConfig::defaults(&registry), registry)
    }

    #[test]
    fn test_request_from_string_and_list() {
        assert_eq!(
            ProjectionRequest::from_value(&json!("audio")),
            ProjectionRequest::from_names(["audio"])
        );
        assert_eq!(
            ProjectionRequest::from_value(&json!(["audio", 3, "melbanks"])),
            ProjectionRequest::from_names(["audio", "melbanks"])
        );
        assert_eq!(ProjectionRequest::from_value(&json!({"a": 1})), ProjectionRequest::all());
    }

    #[test]
    fn test_projects_requested_keys_only() {
        let (config, registry) = live();

        let out = project(&config, &registry, &ProjectionRequest::from_names(["audio", "port"]));

        assert_eq!(out.len(), 2);
        assert_eq!(out["port"], json!(8888));
        assert_eq!(out["audio"]["fft_size"], json!(4096));
    }

    #[test]
    fn test_unknown_keys_fall_back_to_everything() {
        let (config, registry) = live();

        let out = project(&config, &registry, &ProjectionRequest::from_names(["nonsense"]));

        assert_eq!(out.len(), registry.projectable_keys().count());
        assert!(out.contains_key("wled_preferences"));
    }
}
