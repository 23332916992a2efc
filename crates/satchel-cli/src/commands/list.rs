use std::path::Path;

use satchel_core::db::{LibSqlRecordStore, RecordStore};
use satchel_core::EventBus;

use crate::commands::common::{format_timestamp, open_database};
use crate::error::CliError;

pub async fn run_list(
    collection: &str,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

    let mut records = store.get_all(collection).await?;
    records.truncate(limit);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No records in '{collection}'.");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {}  {}",
            record.id,
            format_timestamp(record.updated_at),
            record.status.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn run_get(collection: &str, id: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let store = LibSqlRecordStore::new(db.connection(), EventBus::default());

    let record = store
        .get(collection, id)
        .await?
        .ok_or_else(|| CliError::RecordNotFound(format!("{collection}/{id}")))?;

    println!("{}", serde_json::to_string_pretty(&record.payload)?);
    Ok(())
}
