//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Restart (supervisor.rs):
//!     handler succeeds → PendingRestart attached to the response body
//!     → body fully written and dropped → LifecycleCommand::Restart
//!     → Supervisor triggers Shutdown → process exits with restart code
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight responses drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Supervisor triggers graceful shutdown
//! ```
//!
//! # Design Decisions
//! - The process never restarts itself; the outer process manager relaunches
//!   it when it sees the restart exit code
//! - Shutdown has a grace period: forced exit after the deadline

pub mod shutdown;
pub mod signals;
pub mod supervisor;

pub use shutdown::Shutdown;
pub use supervisor::{Exit, LifecycleCommand, PendingRestart, RestartHandle, RestartReason, Supervisor};
