//! Restart classification for core updates.

use crate::config::namespace::{Fragment, Namespace};
use crate::config::registry::SchemaRegistry;
use crate::config::validation::validate_and_trim;
use crate::error::ConfigError;

/// Core keys that can change without restarting the service.
pub const NO_RESTART_KEYS: &[&str] = &[
    "user_presets",
    "visualisation_fps",
    "visualisation_maxlen",
    "global_transitions",
    "flush_on_deactivate",
    "ui_brightness_boost",
    "scan_on_startup",
    "create_segments",
];

/// Decides whether a core update needs a restart.
///
/// The presence of a single exempt key suppresses the restart for the whole
/// update, even if non-exempt keys were submitted alongside it.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    exempt: &'static [&'static str],
}

impl RestartPolicy {
    pub fn builtin() -> Self {
        Self {
            exempt: NO_RESTART_KEYS,
        }
    }

    pub fn is_exempt(&self, key: &str) -> bool {
        self.exempt.contains(&key)
    }

    /// Classify an already validated and trimmed core fragment.
    pub fn classify(&self, trimmed_core: &Fragment) -> bool {
        if trimmed_core.is_empty() {
            return false;
        }
        !trimmed_core.keys().any(|key| self.is_exempt(key))
    }

    /// Validate and trim a raw core fragment, then classify it.
    pub fn needs_restart(
        &self,
        raw_core: &Fragment,
        registry: &SchemaRegistry,
    ) -> Result<bool, ConfigError> {
        let trimmed = validate_and_trim(raw_core, Namespace::Core, registry)?;
        Ok(self.classify(&trimmed))
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}
