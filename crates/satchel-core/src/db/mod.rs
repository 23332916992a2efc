//! Database layer for Satchel

mod connection;
mod metadata;
mod migrations;
mod queue;
mod store;

pub use connection::Database;
pub use metadata::{LibSqlMetadataStore, MetadataStore, LAST_SYNC_TIMESTAMP_KEY};
pub use queue::{LibSqlSyncQueue, SyncQueue};
pub use store::{LibSqlRecordStore, RecordStore};
