//! Configuration namespaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A partial configuration document: field name to value.
pub type Fragment = serde_json::Map<String, serde_json::Value>;

/// A named partition of the configuration with its own schema.
///
/// `Core` keys live at the top level of the persisted document; every other
/// namespace is a nested object stored under its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Core,
    Audio,
    Melbanks,
    WledPreferences,
}

impl Namespace {
    /// Every namespace, in validation order.
    pub const ALL: [Namespace; 4] = [
        Namespace::Audio,
        Namespace::WledPreferences,
        Namespace::Melbanks,
        Namespace::Core,
    ];

    /// Namespaces stored as nested objects under their own key.
    pub const NESTED: [Namespace; 3] = [
        Namespace::Audio,
        Namespace::WledPreferences,
        Namespace::Melbanks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Core => "core",
            Namespace::Audio => "audio",
            Namespace::Melbanks => "melbanks",
            Namespace::WledPreferences => "wled_preferences",
        }
    }

    /// Map a top-level document key to the nested namespace it holds.
    pub fn from_key(key: &str) -> Option<Namespace> {
        Self::NESTED.into_iter().find(|ns| ns.as_str() == key)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unrecognised namespace name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown configuration namespace '{0}'")]
pub struct UnknownNamespace(pub String);

impl FromStr for Namespace {
    type Err = UnknownNamespace;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(Namespace::Core),
            other => Namespace::from_key(other).ok_or_else(|| UnknownNamespace(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_names_round_trip() {
        for ns in Namespace::ALL {
            assert_eq!(ns.as_str().parse::<Namespace>().unwrap(), ns);
        }
        assert!("devices".parse::<Namespace>().is_err());
    }

    #[test]
    fn test_core_is_not_a_nested_key() {
        assert_eq!(Namespace::from_key("core"), None);
        assert_eq!(Namespace::from_key("melbanks"), Some(Namespace::Melbanks));
    }
}
