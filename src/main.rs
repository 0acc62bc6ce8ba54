//! Configuration mutation service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (axum, request ID, auth) ──▶ admin handlers
//!                                                      │
//!                                                      ▼
//!                                             engine::ConfigEngine
//!                          validate → merge → publish → notify → persist
//!                                                      │
//!                  ┌───────────────────────────────────┼──────────────┐
//!                  ▼                                   ▼              ▼
//!            config (schemas,                  storage (config.json,  lifecycle
//!            versions, LiveConfig)             backups/)              (restart after reply)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use fx_configd::engine::ConfigEngine;
use fx_configd::http::{AppState, HttpServer};
use fx_configd::lifecycle::{Exit, RestartHandle, Shutdown, Supervisor};
use fx_configd::observability::{logging, metrics};
use fx_configd::settings::load_settings;
use fx_configd::storage::FileStorage;

#[derive(Parser)]
#[command(name = "fx-configd", version, about = "Configuration mutation service")]
struct Args {
    /// Path to the service settings TOML file.
    #[arg(short, long, env = "CONFIGD_SETTINGS")]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fx-configd: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let settings = Arc::new(load_settings(args.settings.as_deref())?);

    logging::init(&settings.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fx-configd starting");
    tracing::info!(
        bind_address = %settings.listener.bind_address,
        config_dir = %settings.storage.config_dir.display(),
        auth_enabled = !settings.admin.api_key.is_empty(),
        "Settings loaded"
    );

    if settings.observability.metrics_enabled {
        let addr = settings.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let storage = Arc::new(FileStorage::new(&settings.storage.config_dir));
    let engine = Arc::new(ConfigEngine::builder(storage).open()?);
    tracing::info!(
        configuration_version = engine.snapshot().version(),
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let (restart, commands) = RestartHandle::channel();
    let server = HttpServer::new(AppState {
        engine,
        restart,
        settings: settings.clone(),
    });
    let mut server_task = tokio::spawn(server.run(listener, shutdown.clone()));

    let exit = tokio::select! {
        exit = Supervisor::new(commands, shutdown.clone()).run() => exit,
        result = &mut server_task => {
            result??;
            return Ok(ExitCode::SUCCESS);
        }
    };

    let grace = Duration::from_secs(settings.lifecycle.shutdown_grace_secs);
    match tokio::time::timeout(grace, server_task).await {
        Ok(result) => result??,
        Err(_) => tracing::warn!(grace_secs = grace.as_secs(), "Drain deadline passed, forcing exit"),
    }

    tracing::info!(exit = ?exit, "Shutdown complete");
    Ok(match exit {
        Exit::Signal => ExitCode::SUCCESS,
        Exit::Restart(_) => ExitCode::from(restart_code(settings.lifecycle.restart_exit_code)),
    })
}

fn restart_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(4)
}
