//! Shared helpers for CLI commands

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use satchel_core::config::DEFAULT_MAX_QUEUE_LEN;
use satchel_core::db::{Database, LibSqlRecordStore, LibSqlSyncQueue, RecordStore, SyncQueue};
use satchel_core::models::fresh_id;
use satchel_core::{
    Clock, EventBus, Mutation, Priority, StoredRecord, SyncQueueItem, SyncSettings, SystemClock,
};

use crate::error::CliError;

/// Resolve the database path: flag, then `SATCHEL_DB_PATH`, then the default
/// file in the working directory.
pub fn resolve_db_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("SATCHEL_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("satchel.db"))
}

/// Resolve sync settings from the flag or `SATCHEL_API_URL`.
pub fn resolve_settings(api_url: Option<String>) -> Result<SyncSettings, CliError> {
    let url = api_url
        .or_else(|| std::env::var("SATCHEL_API_URL").ok())
        .ok_or(CliError::MissingApiUrl)?;
    Ok(SyncSettings::new(url)?)
}

/// Open (creating if needed) the local database.
pub async fn open_database(db_path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(Database::open(db_path).await?)
}

/// Render a unix-millisecond timestamp for human output.
pub fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |dt| dt.to_rfc3339())
}

/// Apply a local upsert the way UI clients do: write the store first, then
/// queue the mutation for upload.
///
/// Mints an id when the payload lacks one. Whether the queued mutation is a
/// create or an update depends on whether the record already exists locally.
pub async fn write_through_upsert(
    db: &Database,
    events: &EventBus,
    collection: &str,
    mut payload: Value,
    priority: Priority,
) -> Result<StoredRecord, CliError> {
    let object = payload.as_object_mut().ok_or(CliError::PayloadNotAnObject)?;
    if !object.contains_key("id") {
        object.insert("id".to_string(), json!(fresh_id()));
    }

    let now = SystemClock.now_ms();
    let record = StoredRecord::from_payload(payload.clone(), now)?;

    let store = LibSqlRecordStore::new(db.connection(), events.clone());
    let queue = LibSqlSyncQueue::new(db.connection(), events.clone(), DEFAULT_MAX_QUEUE_LEN);

    let mutation = if store.get(collection, &record.id).await?.is_some() {
        Mutation::Update
    } else {
        Mutation::Create
    };

    store.save(collection, &record).await?;
    queue
        .enqueue(&SyncQueueItem::new(mutation, collection, payload, now).with_priority(priority))
        .await?;

    Ok(record)
}

/// Apply a local delete and queue the matching mutation.
pub async fn write_through_delete(
    db: &Database,
    events: &EventBus,
    collection: &str,
    id: &str,
) -> Result<(), CliError> {
    let store = LibSqlRecordStore::new(db.connection(), events.clone());
    let queue = LibSqlSyncQueue::new(db.connection(), events.clone(), DEFAULT_MAX_QUEUE_LEN);

    if store.get(collection, id).await?.is_none() {
        return Err(CliError::RecordNotFound(id.to_string()));
    }

    let now = SystemClock.now_ms();
    store.delete(collection, id).await?;
    queue
        .enqueue(&SyncQueueItem::new(
            Mutation::Delete,
            collection,
            json!({ "id": id }),
            now,
        ))
        .await?;

    Ok(())
}
