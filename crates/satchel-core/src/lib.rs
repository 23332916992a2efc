//! satchel-core - Core library for Satchel
//!
//! This crate contains the offline-first data layer shared by all Satchel
//! clients: a durable multi-collection local store, a queue of pending
//! mutations, and the sync engine that reconciles both against the remote
//! REST API.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod net;
pub mod sync;
pub mod util;

pub use clock::{Clock, SystemClock};
pub use config::SyncSettings;
pub use error::{Error, Result};
pub use events::{EventBus, SyncEvent};
pub use models::{Mutation, Priority, StoredRecord, SyncQueueItem};
pub use sync::{SyncManager, SyncReport, SyncState};
