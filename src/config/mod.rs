//! Managed configuration model.
//!
//! # Data Flow
//! ```text
//! raw fragment (JSON object)
//!     → registry.rs (permitted keys, schema lookup)
//!     → validation.rs (reject unknown keys, run schema, trim to submitted keys)
//!     → schema.rs (typed records: defaults + range checks)
//!     → document.rs (LiveConfig, one entry per namespace)
//!
//! Import of a full snapshot:
//!     version.rs compares the tag with CONFIGURATION_VERSION
//!     → engine::migration brings older snapshots forward
//!     → LiveConfig::from_document fills defaults for every namespace
//! ```
//!
//! # Design Decisions
//! - Namespaces are a closed enum; there is no runtime registration
//! - Schemas are serde records, validation is a pure function
//! - Fragments stay `serde_json::Map` so trimming works on submitted keys

pub mod document;
pub mod namespace;
pub mod registry;
pub mod schema;
pub mod validation;
pub mod version;

pub use document::LiveConfig;
pub use namespace::{Fragment, Namespace};
pub use registry::{SchemaRegistry, CROSS_CUTTING_KEY};
pub use validation::{validate_and_trim, ValidationError};
pub use version::{ConfigVersion, CONFIGURATION_VERSION, VERSION_KEY};
