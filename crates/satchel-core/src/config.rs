//! Sync engine configuration.
//!
//! `SyncSettings` carries everything the engine needs that is not a runtime
//! dependency: the remote API base URL, the set of tracked collections, and
//! the timing/bound knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::RetryPolicy;
use crate::util::{is_http_url, normalize_text_option};

/// Collections every Satchel client tracks by default
pub const DEFAULT_COLLECTIONS: &[&str] = &["transactions", "activities", "courses", "videos"];

/// Default bound on the pending-mutation queue
pub const DEFAULT_MAX_QUEUE_LEN: usize = 10_000;

/// Configuration for the sync engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Remote API base URL (e.g. `https://api.example.com`)
    pub api_base_url: String,
    /// Collections refreshed during the download phase
    pub collections: Vec<String>,
    /// Periodic sync interval
    pub sync_interval: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Maximum pending mutations before `enqueue` refuses new items
    pub max_queue_len: usize,
    /// Default retry budget for queued mutations
    pub max_retries: u32,
    /// Backoff policy for failed uploads
    pub retry_policy: RetryPolicy,
}

impl SyncSettings {
    /// Create settings for the given API base URL with defaults everywhere
    /// else.
    ///
    /// The URL must include an `http://` or `https://` scheme; a trailing
    /// slash is stripped.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        let api_base_url = normalize_text_option(Some(api_base_url.into()))
            .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
        if !is_http_url(&api_base_url) {
            return Err(Error::InvalidInput(
                "API base URL must include http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            collections: DEFAULT_COLLECTIONS.iter().map(ToString::to_string).collect(),
            sync_interval: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
            max_queue_len: DEFAULT_MAX_QUEUE_LEN,
            max_retries: 3,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Replace the tracked collection set
    #[must_use]
    pub fn with_collections(mut self, collections: Vec<String>) -> Self {
        self.collections = collections;
        self
    }

    /// Set the periodic sync interval
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Set the per-request HTTP timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the pending-mutation bound
    #[must_use]
    pub const fn with_max_queue_len(mut self, limit: usize) -> Self {
        self.max_queue_len = limit;
        self
    }
}
