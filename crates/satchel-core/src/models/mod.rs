//! Data models for the offline store and sync queue

mod queue_item;
mod record;

pub use queue_item::{Mutation, Priority, SyncQueueItem};
pub use record::{fresh_id, StoredRecord};
