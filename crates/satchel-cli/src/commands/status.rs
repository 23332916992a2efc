use std::path::Path;

use serde::Serialize;

use satchel_core::config::{DEFAULT_COLLECTIONS, DEFAULT_MAX_QUEUE_LEN};
use satchel_core::db::{
    LibSqlMetadataStore, LibSqlRecordStore, LibSqlSyncQueue, MetadataStore, RecordStore, SyncQueue,
};
use satchel_core::EventBus;

use crate::commands::common::{format_timestamp, open_database};
use crate::error::CliError;

#[derive(Serialize)]
struct CollectionStatus {
    collection: String,
    records: usize,
    refreshed_at: Option<i64>,
}

#[derive(Serialize)]
struct Status {
    pending_mutations: usize,
    last_sync_at: Option<i64>,
    collections: Vec<CollectionStatus>,
}

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let events = EventBus::default();
    let store = LibSqlRecordStore::new(db.connection(), events.clone());
    let queue = LibSqlSyncQueue::new(db.connection(), events.clone(), DEFAULT_MAX_QUEUE_LEN);
    let metadata = LibSqlMetadataStore::new(db.connection());

    let mut collections = Vec::new();
    for collection in DEFAULT_COLLECTIONS {
        collections.push(CollectionStatus {
            collection: (*collection).to_string(),
            records: store.count(collection).await?,
            refreshed_at: metadata.collection_refreshed_at(collection).await?,
        });
    }

    let status = Status {
        pending_mutations: queue.len().await?,
        last_sync_at: metadata.last_sync_timestamp().await?,
        collections,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match status.last_sync_at {
        Some(timestamp) => println!("Last sync: {}", format_timestamp(timestamp)),
        None => println!("Last sync: never"),
    }
    println!("Pending mutations: {}", status.pending_mutations);
    for entry in &status.collections {
        println!(
            "  {:<14} {:>5} record(s)  refreshed {}",
            entry.collection,
            entry.records,
            entry
                .refreshed_at
                .map_or_else(|| "never".to_string(), format_timestamp)
        );
    }
    Ok(())
}
