//! Sync queue item model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Error;

/// Kind of local mutation awaiting confirmation by the remote authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

impl Mutation {
    /// Stable string form used for storage and wire payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mutation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown mutation '{other}'"))),
        }
    }
}

/// Drain priority for queued mutations.
///
/// Urgent writes (payment confirmations) drain before bulk low-priority
/// traffic; within a band strict enqueue order is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Ordering rank: lower drains first
    #[must_use]
    pub const fn rank(self) -> i64 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// Stable string form used for storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(Error::InvalidInput(format!("unknown priority '{other}'"))),
        }
    }
}

/// One pending local mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Unique queue item id (UUID v7, time-sortable)
    pub id: String,
    /// Mutation kind
    pub mutation: Mutation,
    /// Target collection; must name a collection the store can hold
    pub collection: String,
    /// Entity payload (for deletes, at minimum the `id` field)
    pub payload: Value,
    /// Creation timestamp (unix ms)
    pub enqueued_at: i64,
    /// Drain priority band
    pub priority: Priority,
    /// Failed upload attempts so far
    pub retry_count: u32,
    /// Attempts after which the item is dropped and reported
    pub max_retries: u32,
    /// Earliest next upload attempt (unix ms); backoff gate
    pub next_attempt_at: i64,
}

impl SyncQueueItem {
    /// Default retry budget for new items
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Create a new queue item with default priority and retry budget
    #[must_use]
    pub fn new(mutation: Mutation, collection: impl Into<String>, payload: Value, now: i64) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            mutation,
            collection: collection.into(),
            payload,
            enqueued_at: now,
            priority: Priority::default(),
            retry_count: 0,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            next_attempt_at: now,
        }
    }

    /// Override the priority band
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Override the retry budget
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Id of the entity this mutation targets, when the payload carries one
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.payload.get("id").and_then(Value::as_str)
    }
}
