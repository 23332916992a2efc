//! Freshness metadata repository

use libsql::Connection;

use crate::error::Result;

/// Key under which the global last-sync timestamp is stored
pub const LAST_SYNC_TIMESTAMP_KEY: &str = "last_sync_timestamp";

/// Trait for the flat freshness-metadata namespace (async)
#[allow(async_fn_in_trait)]
pub trait MetadataStore {
    /// Read a raw metadata value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a raw metadata value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Timestamp of the last successful sync round (unix ms)
    async fn last_sync_timestamp(&self) -> Result<Option<i64>> {
        Ok(self
            .get(LAST_SYNC_TIMESTAMP_KEY)
            .await?
            .and_then(|value| value.parse().ok()))
    }

    /// Record the last successful sync round
    async fn set_last_sync_timestamp(&self, timestamp_ms: i64) -> Result<()> {
        self.set(LAST_SYNC_TIMESTAMP_KEY, &timestamp_ms.to_string())
            .await
    }

    /// When a collection was last refreshed from the remote authority
    async fn collection_refreshed_at(&self, collection: &str) -> Result<Option<i64>> {
        Ok(self
            .get(&format!("{collection}_last_updated"))
            .await?
            .and_then(|value| value.parse().ok()))
    }

    /// Record a collection refresh
    async fn set_collection_refreshed_at(&self, collection: &str, timestamp_ms: i64) -> Result<()> {
        self.set(&format!("{collection}_last_updated"), &timestamp_ms.to_string())
            .await
    }
}

/// libSQL implementation of `MetadataStore`
pub struct LibSqlMetadataStore<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlMetadataStore<'a> {
    /// Create a new metadata store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl MetadataStore for LibSqlMetadataStore<'_> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_metadata WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_metadata (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}
