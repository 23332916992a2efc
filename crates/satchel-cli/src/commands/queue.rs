use std::path::Path;

use satchel_core::config::DEFAULT_MAX_QUEUE_LEN;
use satchel_core::db::{LibSqlSyncQueue, SyncQueue};
use satchel_core::EventBus;

use crate::commands::common::{format_timestamp, open_database};
use crate::error::CliError;

pub async fn run_queue_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), DEFAULT_MAX_QUEUE_LEN);

    let items = queue.all().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Sync queue is empty.");
        return Ok(());
    }

    for item in items {
        println!(
            "{}  {:<6} {:<6} {}  retries {}/{}  enqueued {}",
            item.id,
            item.priority.as_str(),
            item.mutation.as_str(),
            item.collection,
            item.retry_count,
            item.max_retries,
            format_timestamp(item.enqueued_at)
        );
    }
    Ok(())
}

pub async fn run_queue_clear(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let queue = LibSqlSyncQueue::new(db.connection(), EventBus::default(), DEFAULT_MAX_QUEUE_LEN);

    let pending = queue.len().await?;
    queue.clear().await?;

    println!("Dropped {pending} pending mutation(s).");
    Ok(())
}
