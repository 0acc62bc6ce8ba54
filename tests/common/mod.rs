//! Shared utilities for integration tests.

use std::sync::Arc;
use std::time::Duration;

use fx_configd::engine::ConfigEngine;
use fx_configd::http::{AppState, HttpServer};
use fx_configd::lifecycle::{LifecycleCommand, RestartHandle, Shutdown};
use fx_configd::settings::ServiceSettings;
use fx_configd::storage::FileStorage;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;

/// A running service backed by a temporary config directory.
#[allow(dead_code)]
pub struct TestService {
    pub url: String,
    pub engine: Arc<ConfigEngine>,
    pub commands: UnboundedReceiver<LifecycleCommand>,
    pub shutdown: Shutdown,
    pub dir: TempDir,
}

impl Drop for TestService {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the HTTP service on an ephemeral port.
#[allow(dead_code)]
pub async fn start_service(api_key: &str) -> TestService {
    let dir = tempfile::tempdir().unwrap();

    let mut settings = ServiceSettings::default();
    settings.storage.config_dir = dir.path().to_path_buf();
    settings.admin.api_key = api_key.to_string();

    let storage = Arc::new(FileStorage::new(dir.path()));
    let engine = Arc::new(ConfigEngine::builder(storage).open().unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let (restart, commands) = RestartHandle::channel();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(AppState {
        engine: engine.clone(),
        restart,
        settings: Arc::new(settings),
    });
    tokio::spawn(server.run(listener, shutdown.clone()));

    TestService {
        url,
        engine,
        commands,
        shutdown,
        dir,
    }
}

/// Wait briefly for the next lifecycle command.
#[allow(dead_code)]
pub async fn next_command(commands: &mut UnboundedReceiver<LifecycleCommand>) -> Option<LifecycleCommand> {
    tokio::time::timeout(Duration::from_secs(2), commands.recv())
        .await
        .ok()
        .flatten()
}

/// Assert that no lifecycle command arrives within a short window.
#[allow(dead_code)]
pub async fn assert_no_command(commands: &mut UnboundedReceiver<LifecycleCommand>) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(commands.try_recv().is_err(), "unexpected lifecycle command");
}

/// Read the persisted `config.json`.
#[allow(dead_code)]
pub fn persisted(dir: &TempDir) -> Value {
    let raw = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Number of backup files written so far.
#[allow(dead_code)]
pub fn backup_count(dir: &TempDir) -> usize {
    match std::fs::read_dir(dir.path().join("backups")) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}
