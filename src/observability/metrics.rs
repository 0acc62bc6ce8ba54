//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_updates_total` (counter): partial updates by `outcome`
//! - `config_imports_total` (counter): imports by `outcome`
//! - `config_resets_total` (counter): successful resets
//! - `config_backups_total` (counter): backups taken by `reason`
//! - `config_restarts_scheduled_total` (counter): restarts by `reason`
//!
//! `outcome` is `success` or the error kind (`validation`, `unknown_key`, ...).

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::error::ConfigError;
use crate::storage::BackupReason;

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn outcome(result: Result<(), &ConfigError>) -> &'static str {
    match result {
        Ok(()) => "success",
        Err(e) => e.kind(),
    }
}

pub fn record_update(result: Result<(), &ConfigError>) {
    ::metrics::counter!("config_updates_total", "outcome" => outcome(result)).increment(1);
}

pub fn record_import(result: Result<(), &ConfigError>) {
    ::metrics::counter!("config_imports_total", "outcome" => outcome(result)).increment(1);
}

pub fn record_reset() {
    ::metrics::counter!("config_resets_total").increment(1);
}

pub fn record_backup(reason: BackupReason) {
    ::metrics::counter!("config_backups_total", "reason" => reason.as_str()).increment(1);
}

pub fn record_restart_scheduled(reason: &'static str) {
    ::metrics::counter!("config_restarts_scheduled_total", "reason" => reason).increment(1);
}
