//! Process supervisor and deferred restarts.
//!
//! # Responsibilities
//! - Receive restart requests from the HTTP layer
//! - Translate OS signals into graceful shutdown
//! - Report why the process is exiting
//!
//! # Design Decisions
//! - A restart request is a message, sent only after the response that
//!   announced it has been fully written
//! - The first command or signal wins; later ones are ignored

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::response::Response;
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use tokio::sync::mpsc;

use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::metrics;

/// Why a restart was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    ConfigUpdated,
    ConfigImported,
    ConfigReset,
}

impl RestartReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartReason::ConfigUpdated => "config_updated",
            RestartReason::ConfigImported => "config_imported",
            RestartReason::ConfigReset => "config_reset",
        }
    }
}

impl std::fmt::Display for RestartReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Restart { reason: RestartReason },
}

/// Sends lifecycle commands to the supervisor.
#[derive(Debug, Clone)]
pub struct RestartHandle {
    tx: mpsc::UnboundedSender<LifecycleCommand>,
}

impl RestartHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LifecycleCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Ask for a restart now.
    pub fn request(&self, reason: RestartReason) {
        metrics::record_restart_scheduled(reason.as_str());
        if self.tx.send(LifecycleCommand::Restart { reason }).is_err() {
            tracing::warn!(reason = %reason, "Restart requested but supervisor is gone");
        } else {
            tracing::info!(reason = %reason, "Restart scheduled");
        }
    }

    /// A restart that fires when the returned guard is dropped.
    pub fn defer(&self, reason: RestartReason) -> PendingRestart {
        PendingRestart {
            handle: self.clone(),
            reason,
        }
    }
}

/// Fires a restart request on drop.
#[derive(Debug)]
pub struct PendingRestart {
    handle: RestartHandle,
    reason: RestartReason,
}

impl PendingRestart {
    /// Hold the restart until `response`'s body has been written and dropped.
    pub fn attach(self, response: Response) -> Response {
        response.map(|inner| {
            Body::new(RestartOnComplete {
                inner,
                _pending: self,
            })
        })
    }
}

impl Drop for PendingRestart {
    fn drop(&mut self) {
        self.handle.request(self.reason);
    }
}

/// Response body wrapper that owns a `PendingRestart`.
struct RestartOnComplete {
    inner: Body,
    _pending: PendingRestart,
}

impl HttpBody for RestartOnComplete {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Why the supervisor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Stopped by an OS signal.
    Signal,
    /// Stopped to apply new configuration.
    Restart(RestartReason),
}

pub struct Supervisor {
    commands: mpsc::UnboundedReceiver<LifecycleCommand>,
    shutdown: Shutdown,
}

impl Supervisor {
    pub fn new(commands: mpsc::UnboundedReceiver<LifecycleCommand>, shutdown: Shutdown) -> Self {
        Self { commands, shutdown }
    }

    /// Wait for a restart command or an OS signal, then trigger shutdown.
    pub async fn run(self) -> Exit {
        self.run_until(async {
            let name = signals::terminate_signal().await;
            tracing::info!(signal = name, "Shutdown signal received");
        })
        .await
    }

    /// As `run`, with `stop` standing in for OS signals.
    pub async fn run_until<F>(mut self, stop: F) -> Exit
    where
        F: Future<Output = ()>,
    {
        let exit = tokio::select! {
            Some(command) = self.commands.recv() => match command {
                LifecycleCommand::Restart { reason } => {
                    tracing::info!(reason = %reason, "Restarting to apply configuration");
                    Exit::Restart(reason)
                }
            },
            _ = stop => Exit::Signal,
        };
        self.shutdown.trigger();
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::time::Duration;

    #[tokio::test]
    async fn test_restart_fires_only_after_body_is_consumed() {
        let (handle, mut rx) = RestartHandle::channel();
        let response = handle
            .defer(RestartReason::ConfigUpdated)
            .attach(Response::new(Body::from("done")));

        assert!(rx.try_recv().is_err());

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"done");
        assert_eq!(
            rx.try_recv().unwrap(),
            LifecycleCommand::Restart {
                reason: RestartReason::ConfigUpdated
            }
        );
    }

    #[tokio::test]
    async fn test_supervisor_triggers_shutdown_on_restart() {
        let (handle, rx) = RestartHandle::channel();
        let shutdown = Shutdown::new();
        let supervisor = Supervisor::new(rx, shutdown.clone());

        handle.request(RestartReason::ConfigReset);
        let exit = tokio::time::timeout(
            Duration::from_secs(1),
            supervisor.run_until(std::future::pending()),
        )
        .await
        .unwrap();

        assert_eq!(exit, Exit::Restart(RestartReason::ConfigReset));
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_supervisor_stops_on_signal() {
        let (_handle, rx) = RestartHandle::channel();
        let shutdown = Shutdown::new();

        let exit = Supervisor::new(rx, shutdown.clone())
            .run_until(async {})
            .await;

        assert_eq!(exit, Exit::Signal);
        assert!(shutdown.is_triggered());
    }
}
