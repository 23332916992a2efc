//! Record store implementation

use libsql::Connection;

use crate::error::Result;
use crate::events::{EventBus, SyncEvent};
use crate::models::StoredRecord;

/// Trait for durable, namespaced record storage (async)
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Upsert a record by id; the last writer wins
    async fn save(&self, collection: &str, record: &StoredRecord) -> Result<()>;

    /// Get a record by id; a missing key is `None`, never an error
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredRecord>>;

    /// Full collection, newest first; callers slice for pagination
    async fn get_all(&self, collection: &str) -> Result<Vec<StoredRecord>>;

    /// Remove a record; missing ids are a no-op
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Remove every record in a collection
    async fn clear(&self, collection: &str) -> Result<()>;

    /// Number of records in a collection
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// libSQL implementation of `RecordStore`
pub struct LibSqlRecordStore<'a> {
    conn: &'a Connection,
    events: EventBus,
}

impl<'a> LibSqlRecordStore<'a> {
    /// Create a new store with the given connection and event bus
    pub const fn new(conn: &'a Connection, events: EventBus) -> Self {
        Self { conn, events }
    }

    async fn notify_updated(&self, collection: &str) -> Result<()> {
        let count = self.count(collection).await?;
        self.events.publish(SyncEvent::DataUpdated {
            collection: collection.to_string(),
            count,
        });
        Ok(())
    }

    fn parse_record(row: &libsql::Row) -> Result<StoredRecord> {
        let payload_text: String = row.get(1)?;
        Ok(StoredRecord {
            id: row.get(0)?,
            payload: serde_json::from_str(&payload_text)?,
            updated_at: row.get(2)?,
            status: optional_text(row.get_value(3)?),
            owner_id: optional_text(row.get_value(4)?),
        })
    }
}

fn optional_text(value: libsql::Value) -> Option<String> {
    match value {
        libsql::Value::Text(text) => Some(text),
        _ => None,
    }
}

fn nullable_text(value: Option<String>) -> libsql::Value {
    value.map_or(libsql::Value::Null, libsql::Value::Text)
}

impl RecordStore for LibSqlRecordStore<'_> {
    async fn save(&self, collection: &str, record: &StoredRecord) -> Result<()> {
        let payload_text = serde_json::to_string(&record.payload)?;

        self.conn
            .execute(
                "INSERT INTO records (collection, id, payload, updated_at, status, owner_id)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT (collection, id) DO UPDATE SET
                    payload = excluded.payload,
                    updated_at = excluded.updated_at,
                    status = excluded.status,
                    owner_id = excluded.owner_id",
                libsql::params![
                    collection,
                    record.id.as_str(),
                    payload_text,
                    record.updated_at,
                    nullable_text(record.status.clone()),
                    nullable_text(record.owner_id.clone())
                ],
            )
            .await?;

        self.notify_updated(collection).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, payload, updated_at, status, owner_id
                 FROM records
                 WHERE collection = ? AND id = ?",
                libsql::params![collection, id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<StoredRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, payload, updated_at, status, owner_id
                 FROM records
                 WHERE collection = ?
                 ORDER BY updated_at DESC",
                libsql::params![collection],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }

        Ok(records)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM records WHERE collection = ? AND id = ?",
                libsql::params![collection, id],
            )
            .await?;

        self.notify_updated(collection).await
    }

    async fn clear(&self, collection: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM records WHERE collection = ?",
                libsql::params![collection],
            )
            .await?;

        self.notify_updated(collection).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM records WHERE collection = ?",
                libsql::params![collection],
            )
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

    fn record(id: &str, payload: serde_json::Value) -> StoredRecord {
        StoredRecord::with_id(id, payload, 100)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_and_get() {
        let db = setup().await;
        let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

        let saved = record("c1", json!({"id": "c1", "name": "Algebra"}));
        store.save("courses", &saved).await.unwrap();

        let fetched = store.get("courses", "c1").await.unwrap().unwrap();
        assert_eq!(fetched, saved);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_missing_is_none() {
        let db = setup().await;
        let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

        assert!(store.get("courses", "ghost").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_overwrites_silently() {
        let db = setup().await;
        let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

        store
            .save("courses", &record("c1", json!({"id": "c1", "name": "Algebra"})))
            .await
            .unwrap();
        store
            .save("courses", &record("c1", json!({"id": "c1", "name": "Geometry"})))
            .await
            .unwrap();

        let fetched = store.get("courses", "c1").await.unwrap().unwrap();
        assert_eq!(fetched.payload["name"], "Geometry");
        assert_eq!(store.count("courses").await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_collections_are_independent_namespaces() {
        let db = setup().await;
        let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

        store
            .save("courses", &record("x", json!({"id": "x"})))
            .await
            .unwrap();
        store
            .save("videos", &record("x", json!({"id": "x", "title": "Intro"})))
            .await
            .unwrap();

        store.delete("courses", "x").await.unwrap();

        assert!(store.get("courses", "x").await.unwrap().is_none());
        assert!(store.get("videos", "x").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_all_newest_first() {
        let db = setup().await;
        let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

        for (id, updated_at) in [("a", 10), ("b", 30), ("c", 20)] {
            let record = StoredRecord::with_id(id, json!({"id": id}), updated_at);
            store.save("activities", &record).await.unwrap();
        }

        let all = store.get_all("activities").await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_missing_is_noop() {
        let db = setup().await;
        let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

        store.delete("courses", "ghost").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear() {
        let db = setup().await;
        let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

        store
            .save("courses", &record("c1", json!({"id": "c1"})))
            .await
            .unwrap();
        store
            .save("courses", &record("c2", json!({"id": "c2"})))
            .await
            .unwrap();

        store.clear("courses").await.unwrap();
        assert_eq!(store.count("courses").await.unwrap(), 0);
        assert!(store.get_all("courses").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mutations_publish_data_updated() {
        let db = setup().await;
        let events = EventBus::default();
        let mut receiver = events.subscribe();
        let store = LibSqlRecordStore::new(db.connection(), events.clone());

        store
            .save("courses", &record("c1", json!({"id": "c1"})))
            .await
            .unwrap();

        assert_eq!(
            receiver.recv().await.unwrap(),
            SyncEvent::DataUpdated {
                collection: "courses".to_string(),
                count: 1
            }
        );

        store.delete("courses", "c1").await.unwrap();
        assert_eq!(
            receiver.recv().await.unwrap(),
            SyncEvent::DataUpdated {
                collection: "courses".to_string(),
                count: 0
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_last_write_wins_sequence() {
        let db = setup().await;
        let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

        store
            .save("courses", &record("c1", json!({"id": "c1", "v": 1})))
            .await
            .unwrap();
        store.delete("courses", "c1").await.unwrap();
        store
            .save("courses", &record("c1", json!({"id": "c1", "v": 2})))
            .await
            .unwrap();

        let fetched = store.get("courses", "c1").await.unwrap().unwrap();
        assert_eq!(fetched.payload["v"], 2);
    }
}
