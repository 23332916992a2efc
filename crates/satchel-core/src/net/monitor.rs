//! Connectivity monitor.
//!
//! Single source of truth for the online/offline state. The flag is a
//! best-effort signal fed by whatever the host platform can observe, not a
//! guarantee that the remote API is reachable.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::events::{EventBus, SyncEvent};

/// Tracks connectivity and emits one event per transition
#[derive(Debug)]
pub struct NetworkMonitor {
    online: AtomicBool,
    events: EventBus,
    tx: watch::Sender<bool>,
}

impl NetworkMonitor {
    /// Create a monitor with the given initial state
    #[must_use]
    pub fn new(initially_online: bool, events: EventBus) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self {
            online: AtomicBool::new(initially_online),
            events,
            tx,
        }
    }

    /// Current connectivity state
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Report an observed connectivity state.
    ///
    /// Repeated identical states are ignored; a real transition publishes
    /// `Online`/`Offline` exactly once and wakes `changes()` watchers.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }

        tracing::info!(online, "Connectivity changed");
        self.events.publish(if online {
            SyncEvent::Online
        } else {
            SyncEvent::Offline
        });
        let _ = self.tx.send(online);
    }

    /// Watch channel that fires on every transition; used by the sync
    /// engine's reconnect trigger
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transitions_emit_exactly_once() {
        let events = EventBus::default();
        let mut receiver = events.subscribe();
        let monitor = NetworkMonitor::new(true, events.clone());

        monitor.set_online(true); // no transition
        monitor.set_online(false);
        monitor.set_online(false); // no transition
        monitor.set_online(true);

        assert_eq!(receiver.recv().await.unwrap(), SyncEvent::Offline);
        assert_eq!(receiver.recv().await.unwrap(), SyncEvent::Online);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn state_reflects_last_report() {
        let monitor = NetworkMonitor::new(false, EventBus::default());
        assert!(!monitor.is_online());

        monitor.set_online(true);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn watchers_see_transitions() {
        let monitor = NetworkMonitor::new(false, EventBus::default());
        let mut changes = monitor.changes();
        assert!(!*changes.borrow_and_update());

        monitor.set_online(true);
        changes.changed().await.unwrap();
        assert!(*changes.borrow_and_update());
    }
}
