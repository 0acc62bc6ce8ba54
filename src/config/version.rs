//! Configuration version tags.
//!
//! Tags are compared leniently: `"2"`, `"2.1"`, `"v2.1.0"` and the number
//! `2.1` all parse. A missing or unparseable tag is `Legacy`, which orders
//! before every tagged version.

use std::cmp::Ordering;
use std::fmt;

use semver::Version;
use serde_json::Value;

use crate::config::namespace::Fragment;

/// Version of the configuration layout this build reads and writes.
pub const CONFIGURATION_VERSION: &str = "2.1";

/// Document key holding the version tag.
pub const VERSION_KEY: &str = "configuration_version";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigVersion {
    /// No usable tag; treated as older than any tagged version.
    Legacy,
    Tagged(Version),
}

impl ConfigVersion {
    pub fn current() -> Self {
        Self::parse(CONFIGURATION_VERSION)
    }

    /// Parse a tag, padding missing minor/patch components with zero.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim().trim_start_matches(['v', 'V']);
        let (core, suffix) = match trimmed.find(['-', '+']) {
            Some(idx) => trimmed.split_at(idx),
            None => (trimmed, ""),
        };
        let parts = core.split('.').count();
        let padded = match parts {
            1 => format!("{}.0.0{}", core, suffix),
            2 => format!("{}.0{}", core, suffix),
            _ => trimmed.to_string(),
        };
        match Version::parse(&padded) {
            Ok(version) => ConfigVersion::Tagged(version),
            Err(_) => ConfigVersion::Legacy,
        }
    }

    /// Read the tag of a configuration document.
    pub fn of_document(document: &Fragment) -> Self {
        match document.get(VERSION_KEY) {
            Some(Value::String(raw)) => Self::parse(raw),
            Some(Value::Number(n)) => Self::parse(&n.to_string()),
            _ => ConfigVersion::Legacy,
        }
    }

    pub fn is_current(&self) -> bool {
        *self == Self::current()
    }

    /// Whether this version falls in `[min, max)`.
    pub fn within(&self, min: &ConfigVersion, max: &ConfigVersion) -> bool {
        self >= min && self < max
    }
}

impl PartialOrd for ConfigVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfigVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ConfigVersion::Legacy, ConfigVersion::Legacy) => Ordering::Equal,
            (ConfigVersion::Legacy, ConfigVersion::Tagged(_)) => Ordering::Less,
            (ConfigVersion::Tagged(_), ConfigVersion::Legacy) => Ordering::Greater,
            (ConfigVersion::Tagged(a), ConfigVersion::Tagged(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigVersion::Legacy => f.write_str("UNDEFINED"),
            ConfigVersion::Tagged(v) if v.patch == 0 && v.pre.is_empty() && v.build.is_empty() => {
                write!(f, "{}.{}", v.major, v.minor)
            }
            ConfigVersion::Tagged(v) => write!(f, "{}", v),
        }
    }
}
