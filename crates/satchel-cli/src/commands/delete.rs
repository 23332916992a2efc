use std::path::Path;

use satchel_core::EventBus;

use crate::commands::common::{open_database, write_through_delete};
use crate::error::CliError;

pub async fn run_delete(collection: &str, id: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let events = EventBus::default();

    write_through_delete(&db, &events, collection, id).await?;

    println!("Deleted {collection}/{id} (queued for sync)");
    Ok(())
}
