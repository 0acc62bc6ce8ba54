//! Trimming validation of submitted fragments.
//!
//! # Responsibilities
//! - Reject fragments carrying keys outside the namespace allow-list
//! - Run the namespace schema (type checks, ranges, defaults)
//! - Trim the schema output back to the keys the caller submitted
//!
//! # Design Decisions
//! - Fail fast: one forbidden key rejects the whole fragment
//! - Schema defaults never leak into a fragment the caller did not mention
//! - `user_presets` is accepted in every namespace but only reaches the
//!   schemas that declare it

use std::fmt;

use crate::config::namespace::{Fragment, Namespace};
use crate::config::registry::{SchemaRegistry, CROSS_CUTTING_KEY};
use crate::error::ConfigError;

/// A schema rejected a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{namespace} config field '{path}': {reason}")]
pub struct ValidationError {
    /// Namespace whose schema rejected the value.
    pub namespace: Namespace,
    /// Dotted path of the offending field, relative to the namespace.
    pub path: String,
    /// Which rule failed.
    pub reason: String,
}

impl ValidationError {
    pub fn new(namespace: Namespace, path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            namespace,
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Value outside an inclusive range.
    pub fn out_of_range<T: fmt::Display>(
        namespace: Namespace,
        path: impl Into<String>,
        value: T,
        min: T,
        max: T,
    ) -> Self {
        Self::new(
            namespace,
            path,
            format!("value {} is outside the allowed range {}..={}", value, min, max),
        )
    }
}

/// Validate `fragment` against `namespace` and keep only the submitted keys.
///
/// The returned key set is always a subset of the input key set.
pub fn validate_and_trim(
    fragment: &Fragment,
    namespace: Namespace,
    registry: &SchemaRegistry,
) -> Result<Fragment, ConfigError> {
    let entry = registry.entry(namespace);

    if let Some(key) = fragment
        .keys()
        .find(|key| key.as_str() != CROSS_CUTTING_KEY && !entry.is_permitted(key))
    {
        return Err(ConfigError::UnknownKey {
            namespace,
            key: key.clone(),
        });
    }

    let schema_input: Fragment = fragment
        .iter()
        .filter(|(key, _)| entry.declares(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let validated = entry.apply(&schema_input)?;

    Ok(fragment
        .keys()
        .filter_map(|key| validated.get(key).map(|value| (key.clone(), value.clone())))
        .collect())
}
