//! Configuration mutation service library.

pub mod admin;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod settings;
pub mod storage;

pub use config::{LiveConfig, Namespace};
pub use engine::{ConfigEngine, ImportOutcome, UpdateOutcome};
pub use error::ConfigError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use settings::ServiceSettings;
