//! Change notification for dependent subsystems.
//!
//! # Responsibilities
//! - Call the notifiers registered for a namespace after it changed
//! - Broadcast `ConfigEvent`s to any number of subscribers
//!
//! # Design Decisions
//! - Fire-and-forget: a notifier cannot fail or veto a committed change
//! - Notifiers only run for namespaces with a non-empty validated fragment

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::namespace::{Fragment, Namespace};
use crate::storage::BackupReason;

/// Capacity of the event broadcast channel.
const EVENT_CAPACITY: usize = 64;

/// A namespace that received new values.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    pub namespace: Namespace,
    /// The validated, trimmed fragment that was merged.
    pub changed: Fragment,
    /// The namespace's full live value after the merge.
    pub current: Fragment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    NamespaceChanged(ConfigChange),
    /// Core keys were updated; fired once per update.
    CoreUpdated { keys: Vec<String> },
    /// Live configuration was replaced wholesale.
    Replaced { reason: BackupReason },
}

/// Subsystem that re-reads its configuration when it changes.
pub trait ChangeNotifier: Send + Sync {
    fn config_changed(&self, change: &ConfigChange);
}

pub struct Notifiers {
    by_namespace: HashMap<Namespace, Vec<Arc<dyn ChangeNotifier>>>,
    events: broadcast::Sender<ConfigEvent>,
}

impl Notifiers {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            by_namespace: HashMap::new(),
            events,
        }
    }

    pub fn register(&mut self, namespace: Namespace, notifier: Arc<dyn ChangeNotifier>) {
        self.by_namespace.entry(namespace).or_default().push(notifier);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.events.subscribe()
    }

    /// Deliver a namespace change to its notifiers and subscribers.
    pub fn dispatch(&self, change: ConfigChange) {
        if let Some(notifiers) = self.by_namespace.get(&change.namespace) {
            for notifier in notifiers {
                notifier.config_changed(&change);
            }
        }
        tracing::debug!(
            namespace = %change.namespace,
            keys = change.changed.len(),
            "Configuration change dispatched"
        );
        self.emit(ConfigEvent::NamespaceChanged(change));
    }

    pub fn emit(&self, event: ConfigEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for Notifiers {
    fn default() -> Self {
        Self::new()
    }
}
