//! Sync queue implementation

use std::str::FromStr;

use libsql::Connection;

use crate::error::{Error, Result};
use crate::events::{EventBus, SyncEvent};
use crate::models::{Mutation, Priority, SyncQueueItem};

/// Trait for the durable backlog of unconfirmed mutations (async)
#[allow(async_fn_in_trait)]
pub trait SyncQueue {
    /// Append an item; fails with `QueueFull` past the configured bound
    async fn enqueue(&self, item: &SyncQueueItem) -> Result<()>;

    /// Items due at `now` (backoff gate passed), in drain order: priority
    /// band first, then enqueue time ascending
    async fn due(&self, now: i64) -> Result<Vec<SyncQueueItem>>;

    /// Every item in drain order, ignoring the backoff gate
    async fn all(&self) -> Result<Vec<SyncQueueItem>>;

    /// Remove one item; the only way an item leaves the queue besides `clear`
    async fn remove(&self, id: &str) -> Result<()>;

    /// Bump an item's retry count and push its next attempt out to
    /// `next_attempt_at`
    async fn record_failure(&self, id: &str, next_attempt_at: i64) -> Result<()>;

    /// Drop the whole backlog
    async fn clear(&self) -> Result<()>;

    /// Number of pending items
    async fn len(&self) -> Result<usize>;
}

/// libSQL implementation of `SyncQueue`
pub struct LibSqlSyncQueue<'a> {
    conn: &'a Connection,
    events: EventBus,
    max_len: usize,
}

impl<'a> LibSqlSyncQueue<'a> {
    /// Create a new queue with the given connection, event bus, and bound
    pub const fn new(conn: &'a Connection, events: EventBus, max_len: usize) -> Self {
        Self {
            conn,
            events,
            max_len,
        }
    }

    async fn notify_updated(&self) -> Result<()> {
        let pending = self.len().await?;
        self.events.publish(SyncEvent::SyncQueueUpdated { pending });
        Ok(())
    }

    fn parse_item(row: &libsql::Row) -> Result<SyncQueueItem> {
        let mutation_text: String = row.get(1)?;
        let payload_text: String = row.get(3)?;
        let priority_rank: i64 = row.get(4)?;
        let retry_count: i64 = row.get(6)?;
        let max_retries: i64 = row.get(7)?;

        let priority = match priority_rank {
            0 => Priority::High,
            2 => Priority::Low,
            _ => Priority::Medium,
        };

        Ok(SyncQueueItem {
            id: row.get(0)?,
            mutation: Mutation::from_str(&mutation_text)?,
            collection: row.get(2)?,
            payload: serde_json::from_str(&payload_text)?,
            priority,
            enqueued_at: row.get(5)?,
            retry_count: u32::try_from(retry_count).unwrap_or(0),
            max_retries: u32::try_from(max_retries).unwrap_or(0),
            next_attempt_at: row.get(8)?,
        })
    }

    async fn select(&self, where_clause: &str, params: impl libsql::params::IntoParams) -> Result<Vec<SyncQueueItem>> {
        let sql = format!(
            "SELECT id, mutation, collection, payload, priority,
                    enqueued_at, retry_count, max_retries, next_attempt_at
             FROM sync_queue
             {where_clause}
             ORDER BY priority ASC, enqueued_at ASC"
        );

        let mut rows = self.conn.query(&sql, params).await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::parse_item(&row)?);
        }

        Ok(items)
    }
}

impl SyncQueue for LibSqlSyncQueue<'_> {
    async fn enqueue(&self, item: &SyncQueueItem) -> Result<()> {
        if self.len().await? >= self.max_len {
            return Err(Error::QueueFull {
                limit: self.max_len,
            });
        }

        let payload_text = serde_json::to_string(&item.payload)?;

        self.conn
            .execute(
                "INSERT INTO sync_queue
                    (id, mutation, collection, payload, priority,
                     enqueued_at, retry_count, max_retries, next_attempt_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    item.id.as_str(),
                    item.mutation.as_str(),
                    item.collection.as_str(),
                    payload_text,
                    item.priority.rank(),
                    item.enqueued_at,
                    i64::from(item.retry_count),
                    i64::from(item.max_retries),
                    item.next_attempt_at
                ],
            )
            .await?;

        self.notify_updated().await
    }

    async fn due(&self, now: i64) -> Result<Vec<SyncQueueItem>> {
        self.select("WHERE next_attempt_at <= ?", libsql::params![now])
            .await
    }

    async fn all(&self) -> Result<Vec<SyncQueueItem>> {
        self.select("", ()).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM sync_queue WHERE id = ?",
                libsql::params![id],
            )
            .await?;

        self.notify_updated().await
    }

    async fn record_failure(&self, id: &str, next_attempt_at: i64) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE sync_queue
                 SET retry_count = retry_count + 1, next_attempt_at = ?
                 WHERE id = ?",
                libsql::params![next_attempt_at, id],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM sync_queue", ()).await?;
        self.notify_updated().await
    }

    async fn len(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM sync_queue", ())
            .await?;

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn item(priority: Priority, enqueued_at: i64) -> SyncQueueItem {
        SyncQueueItem::new(
            Mutation::Create,
            "activities",
            json!({"id": format!("{priority}-{enqueued_at}")}),
            enqueued_at,
        )
        .with_priority(priority)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_and_len() {
        let db = setup().await;
        let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), 100);

        assert_eq!(queue.len().await.unwrap(), 0);
        queue.enqueue(&item(Priority::Medium, 1)).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drain_order_priority_then_fifo() {
        let db = setup().await;
        let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), 100);

        // Enqueued: low, high, medium, high
        let low = item(Priority::Low, 1);
        let high_first = item(Priority::High, 2);
        let medium = item(Priority::Medium, 3);
        let high_second = item(Priority::High, 4);

        for queued in [&low, &high_first, &medium, &high_second] {
            queue.enqueue(queued).await.unwrap();
        }

        let drained = queue.due(100).await.unwrap();
        let ids: Vec<&str> = drained.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                high_first.id.as_str(),
                high_second.id.as_str(),
                medium.id.as_str(),
                low.id.as_str()
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_due_respects_backoff_gate() {
        let db = setup().await;
        let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), 100);

        let queued = item(Priority::Medium, 10);
        queue.enqueue(&queued).await.unwrap();
        queue.record_failure(&queued.id, 500).await.unwrap();

        assert!(queue.due(100).await.unwrap().is_empty());
        assert_eq!(queue.due(500).await.unwrap().len(), 1);
        // all() ignores the gate
        assert_eq!(queue.all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_failure_bumps_retry_count() {
        let db = setup().await;
        let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), 100);

        let queued = item(Priority::Medium, 10);
        queue.enqueue(&queued).await.unwrap();
        queue.record_failure(&queued.id, 20).await.unwrap();
        queue.record_failure(&queued.id, 40).await.unwrap();

        let all = queue.all().await.unwrap();
        assert_eq!(all[0].retry_count, 2);
        assert_eq!(all[0].next_attempt_at, 40);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_failure_on_missing_item() {
        let db = setup().await;
        let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), 100);

        let err = queue.record_failure("ghost", 1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_is_the_only_exit() {
        let db = setup().await;
        let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), 100);

        let queued = item(Priority::Medium, 10);
        queue.enqueue(&queued).await.unwrap();

        // A failed attempt keeps the item pending
        queue.record_failure(&queued.id, 20).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 1);

        queue.remove(&queued.id).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_queue_bound() {
        let db = setup().await;
        let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), 2);

        queue.enqueue(&item(Priority::Medium, 1)).await.unwrap();
        queue.enqueue(&item(Priority::Medium, 2)).await.unwrap();

        let err = queue.enqueue(&item(Priority::Medium, 3)).await.unwrap_err();
        assert!(matches!(err, Error::QueueFull { limit: 2 }));
        assert_eq!(queue.len().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_queue_mutations_publish_events() {
        let db = setup().await;
        let events = EventBus::default();
        let mut receiver = events.subscribe();
        let queue = LibSqlSyncQueue::new(db.connection(), events.clone(), 100);

        let queued = item(Priority::Medium, 1);
        queue.enqueue(&queued).await.unwrap();
        assert_eq!(
            receiver.recv().await.unwrap(),
            SyncEvent::SyncQueueUpdated { pending: 1 }
        );

        queue.remove(&queued.id).await.unwrap();
        assert_eq!(
            receiver.recv().await.unwrap(),
            SyncEvent::SyncQueueUpdated { pending: 0 }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear() {
        let db = setup().await;
        let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), 100);

        queue.enqueue(&item(Priority::Medium, 1)).await.unwrap();
        queue.enqueue(&item(Priority::High, 2)).await.unwrap();

        queue.clear().await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_items_round_trip_fields() {
        let db = setup().await;
        let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), 100);

        let queued = SyncQueueItem::new(
            Mutation::Delete,
            "transactions",
            json!({"id": "t1", "amount": 250_000}),
            42,
        )
        .with_priority(Priority::High)
        .with_max_retries(5);

        queue.enqueue(&queued).await.unwrap();

        let fetched = queue.all().await.unwrap().remove(0);
        assert_eq!(fetched, queued);
    }
}
