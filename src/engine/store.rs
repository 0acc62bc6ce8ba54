//! Live configuration store.
//!
//! Readers load an `Arc<LiveConfig>` snapshot without locking. Writers
//! serialize on a mutex, build the next document off to the side and publish
//! it in one swap, so a reader never sees a half-applied update.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::config::document::LiveConfig;

pub struct LiveConfigStore {
    current: ArcSwap<LiveConfig>,
    writer: Mutex<()>,
}

impl LiveConfigStore {
    pub fn new(initial: LiveConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            writer: Mutex::new(()),
        }
    }

    /// Current configuration.
    pub fn snapshot(&self) -> Arc<LiveConfig> {
        self.current.load_full()
    }

    /// Exclusive write access for one transaction.
    pub(crate) fn begin(&self) -> WriteGuard<'_> {
        WriteGuard {
            store: self,
            _lock: self.writer.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Held for the duration of a mutation.
pub(crate) struct WriteGuard<'a> {
    store: &'a LiveConfigStore,
    _lock: MutexGuard<'a, ()>,
}

impl WriteGuard<'_> {
    /// The configuration this transaction starts from.
    pub(crate) fn current(&self) -> Arc<LiveConfig> {
        self.store.snapshot()
    }

    /// Make `next` visible to readers.
    pub(crate) fn publish(&self, next: LiveConfig) -> Arc<LiveConfig> {
        let next = Arc::new(next);
        self.store.current.store(Arc::clone(&next));
        next
    }
}
