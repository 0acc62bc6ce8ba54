//! Service settings for the daemon itself.
//!
//! These are distinct from the managed configuration: they are read once at
//! startup from a TOML file and never changed by the API.
//!
//! # Data Flow
//! ```text
//! settings.toml (optional)
//!     → loader.rs (parse, env overrides)
//!     → loader.rs::validate (all errors collected)
//!     → ServiceSettings shared read-only by main, http and lifecycle
//! ```

pub mod loader;
pub mod schema;

pub use loader::{load_settings, validate_settings, SettingsError};
pub use schema::{
    AdminSettings, LifecycleSettings, ListenerSettings, ObservabilitySettings, ServiceSettings,
    StorageSettings,
};
