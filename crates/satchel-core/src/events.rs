//! In-process event bus.
//!
//! Store mutations, queue changes, and sync lifecycle transitions are
//! published here so consumers (UI layers, the CLI `watch` command) can react
//! without polling. Delivery is broadcast, fire-and-forget: subscribers that
//! attach after an event has fired do not see it.

use tokio::sync::broadcast;

use crate::models::Mutation;

/// Events published by the store, queue, monitor, and sync engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Connectivity regained
    Online,
    /// Connectivity lost
    Offline,
    /// A sync round entered the upload phase
    SyncStarted,
    /// A sync round finished; partial failures are reflected in the counts
    SyncCompleted {
        uploaded: usize,
        dropped: usize,
        downloaded: usize,
        failed_collections: usize,
    },
    /// A sync round could not make any progress
    SyncFailed { reason: String },
    /// A queued mutation exhausted its retry budget or was rejected outright
    MutationDropped {
        id: String,
        collection: String,
        mutation: Mutation,
        reason: String,
    },
    /// A local-store collection was mutated
    DataUpdated { collection: String, count: usize },
    /// A collection was refreshed from the remote authority
    CacheUpdated { collection: String, count: usize },
    /// The pending-mutation backlog changed
    SyncQueueUpdated { pending: usize },
}

/// Cheap-to-clone handle for publishing and subscribing to [`SyncEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a bus retaining up to `capacity` undelivered events per
    /// subscriber; slow subscribers see a lag error, not a blocked publisher.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all events published after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut receiver = bus.subscribe();

        bus.publish(SyncEvent::SyncStarted);
        bus.publish(SyncEvent::SyncQueueUpdated { pending: 2 });

        assert_eq!(receiver.recv().await.unwrap(), SyncEvent::SyncStarted);
        assert_eq!(
            receiver.recv().await.unwrap(),
            SyncEvent::SyncQueueUpdated { pending: 2 }
        );
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::default();
        bus.publish(SyncEvent::Online); // must not panic or error
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let bus = EventBus::default();
        bus.publish(SyncEvent::Online);

        let mut receiver = bus.subscribe();
        bus.publish(SyncEvent::Offline);

        assert_eq!(receiver.recv().await.unwrap(), SyncEvent::Offline);
        assert!(receiver.try_recv().is_err());
    }
}
