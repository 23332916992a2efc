use std::path::Path;

use satchel_core::{EventBus, Priority};
use serde_json::Value;

use crate::commands::common::{open_database, write_through_upsert};
use crate::error::CliError;

pub async fn run_add(
    collection: &str,
    payload: &str,
    priority: Priority,
    db_path: &Path,
) -> Result<(), CliError> {
    let payload: Value = serde_json::from_str(payload)?;

    let db = open_database(db_path).await?;
    let events = EventBus::default();
    let record = write_through_upsert(&db, &events, collection, payload, priority).await?;

    println!("Saved {collection}/{} (queued for sync)", record.id);
    Ok(())
}
