//! Sync engine.
//!
//! [`SyncManager`] reconciles the local store with the remote authority:
//! it drains the pending-mutation queue (upload phase), pulls incremental
//! remote changes into the store (download phase), and records freshness
//! metadata. It is an explicit service object: storage handle, HTTP client,
//! clock, event bus, and connectivity monitor are all injected, so the whole
//! protocol is testable without a network or real time.

mod backoff;

pub use backoff::RetryPolicy;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::config::SyncSettings;
use crate::db::{
    Database, LibSqlMetadataStore, LibSqlRecordStore, LibSqlSyncQueue, MetadataStore, RecordStore,
    SyncQueue,
};
use crate::error::{Error, Result};
use crate::events::{EventBus, SyncEvent};
use crate::models::{Mutation, StoredRecord, SyncQueueItem};
use crate::net::{NetworkMonitor, RemoteApi};

/// Observable engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No round in flight
    Idle,
    /// A round is in flight
    Syncing,
    /// The last round made no progress; cleared when the next round starts
    Error,
}

const STATE_IDLE: u8 = 0;
const STATE_SYNCING: u8 = 1;
const STATE_ERROR: u8 = 2;

/// Outcome of one sync round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Round start time (unix ms); becomes the next `since` watermark
    pub started_at: i64,
    /// Mutations confirmed by the remote and removed from the queue
    pub uploaded: usize,
    /// Mutations that failed transiently and wait behind a backoff gate
    pub deferred: usize,
    /// Mutations dropped: retry budget exhausted or permanently rejected
    pub dropped: usize,
    /// Records upserted from the remote
    pub downloaded: usize,
    /// Collections whose download failed this round
    pub failed_collections: usize,
    /// Queue depth after the round
    pub pending: usize,
    /// Whether the freshness watermark advanced
    pub advanced: bool,
}

/// Orchestrates the synchronization protocol
pub struct SyncManager<A, C> {
    db: Arc<Database>,
    remote: A,
    clock: C,
    settings: SyncSettings,
    events: EventBus,
    monitor: Arc<NetworkMonitor>,
    in_flight: AtomicBool,
    state: AtomicU8,
}

impl<A: RemoteApi, C: Clock> SyncManager<A, C> {
    /// Create a manager over the given dependencies
    pub fn new(
        db: Arc<Database>,
        remote: A,
        clock: C,
        settings: SyncSettings,
        events: EventBus,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        Self {
            db,
            remote,
            clock,
            settings,
            events,
            monitor,
            in_flight: AtomicBool::new(false),
            state: AtomicU8::new(STATE_IDLE),
        }
    }

    /// Current engine state
    pub fn state(&self) -> SyncState {
        match self.state.load(Ordering::SeqCst) {
            STATE_SYNCING => SyncState::Syncing,
            STATE_ERROR => SyncState::Error,
            _ => SyncState::Idle,
        }
    }

    /// Run one sync round.
    ///
    /// Returns `Ok(None)` when a round is already in flight; concurrent
    /// triggers are ignored, not queued. Returns `Err(Error::Offline)`
    /// without touching the freshness watermark when the monitor reports no
    /// connectivity.
    pub async fn sync(&self) -> Result<Option<SyncReport>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Sync already in flight; trigger ignored");
            return Ok(None);
        }

        let result = self.round().await;
        self.in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(report) => Ok(Some(report)),
            Err(error) => {
                self.state.store(STATE_ERROR, Ordering::SeqCst);
                Err(error)
            }
        }
    }

    /// Drive periodic syncs and the reconnect trigger until the task is
    /// dropped.
    ///
    /// The first interval tick fires immediately, giving a catch-up round on
    /// startup.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.settings.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut changes = self.monitor.changes();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.monitor.is_online() {
                        if let Err(error) = self.sync().await {
                            tracing::warn!(%error, "Periodic sync failed");
                        }
                    } else {
                        tracing::debug!("Skipping periodic sync while offline");
                    }
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *changes.borrow_and_update() {
                        tracing::info!("Connectivity regained; syncing");
                        if let Err(error) = self.sync().await {
                            tracing::warn!(%error, "Reconnect sync failed");
                        }
                    }
                }
            }
        }
    }

    async fn round(&self) -> Result<SyncReport> {
        let started_at = self.clock.now_ms();

        if !self.monitor.is_online() {
            self.events.publish(SyncEvent::SyncFailed {
                reason: "offline".to_string(),
            });
            return Err(Error::Offline);
        }

        self.state.store(STATE_SYNCING, Ordering::SeqCst);
        self.events.publish(SyncEvent::SyncStarted);

        let conn = self.db.connection();
        let store = LibSqlRecordStore::new(conn, self.events.clone());
        let queue = LibSqlSyncQueue::new(conn, self.events.clone(), self.settings.max_queue_len);
        let metadata = LibSqlMetadataStore::new(conn);

        // Upload strictly precedes download so a stale pull cannot clobber
        // changes that are still waiting in the queue.
        let (uploaded, deferred, dropped) = self.upload_phase(&queue, started_at).await?;

        let since = metadata.last_sync_timestamp().await?.unwrap_or(0);
        let (downloaded, failed_collections) =
            self.download_phase(&store, &metadata, since).await?;

        let refreshed = self.settings.collections.len() - failed_collections;
        let total_failure = uploaded == 0
            && dropped == 0
            && refreshed == 0
            && !self.settings.collections.is_empty();

        let pending = queue.len().await?;

        if total_failure {
            tracing::warn!("Sync round made no progress");
            self.events.publish(SyncEvent::SyncFailed {
                reason: "no collection could be refreshed and no mutation was confirmed"
                    .to_string(),
            });
            self.state.store(STATE_ERROR, Ordering::SeqCst);
            return Ok(SyncReport {
                started_at,
                uploaded,
                deferred,
                dropped,
                downloaded,
                failed_collections,
                pending,
                advanced: false,
            });
        }

        // Watermark moves to the round start, not its end: records changed
        // while the round ran are picked up again next time.
        metadata.set_last_sync_timestamp(started_at).await?;
        self.events.publish(SyncEvent::SyncCompleted {
            uploaded,
            dropped,
            downloaded,
            failed_collections,
        });
        self.state.store(STATE_IDLE, Ordering::SeqCst);

        tracing::info!(
            uploaded,
            deferred,
            dropped,
            downloaded,
            failed_collections,
            pending,
            "Sync round complete"
        );

        Ok(SyncReport {
            started_at,
            uploaded,
            deferred,
            dropped,
            downloaded,
            failed_collections,
            pending,
            advanced: true,
        })
    }

    async fn upload_phase(
        &self,
        queue: &LibSqlSyncQueue<'_>,
        now: i64,
    ) -> Result<(usize, usize, usize)> {
        let due = queue.due(now).await?;
        let mut uploaded = 0;
        let mut deferred = 0;
        let mut dropped = 0;

        for item in due {
            match self.push_item(&item).await {
                Ok(()) => {
                    // Items leave the queue one by one, only on confirmation
                    queue.remove(&item.id).await?;
                    uploaded += 1;
                }
                Err(error) if error.is_retryable() && item.retry_count + 1 < item.max_retries => {
                    let delay = self.settings.retry_policy.jittered_delay_for(item.retry_count + 1);
                    let gate = now + i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
                    queue.record_failure(&item.id, gate).await?;
                    deferred += 1;
                    tracing::warn!(
                        id = %item.id,
                        collection = %item.collection,
                        retry_count = item.retry_count + 1,
                        %error,
                        "Upload failed; will retry"
                    );
                }
                Err(error) => {
                    queue.remove(&item.id).await?;
                    dropped += 1;
                    tracing::error!(
                        id = %item.id,
                        collection = %item.collection,
                        mutation = %item.mutation,
                        %error,
                        "Dropping mutation"
                    );
                    self.events.publish(SyncEvent::MutationDropped {
                        id: item.id.clone(),
                        collection: item.collection.clone(),
                        mutation: item.mutation,
                        reason: error.to_string(),
                    });
                }
            }
        }

        Ok((uploaded, deferred, dropped))
    }

    async fn push_item(&self, item: &SyncQueueItem) -> Result<()> {
        match item.mutation {
            Mutation::Create => self.remote.create(&item.collection, &item.payload).await,
            Mutation::Update => {
                let id = item.entity_id().ok_or_else(|| {
                    Error::InvalidInput("update mutation payload has no 'id'".to_string())
                })?;
                self.remote.update(&item.collection, id, &item.payload).await
            }
            Mutation::Delete => {
                let id = item.entity_id().ok_or_else(|| {
                    Error::InvalidInput("delete mutation payload has no 'id'".to_string())
                })?;
                self.remote.delete(&item.collection, id).await
            }
        }
    }

    async fn download_phase(
        &self,
        store: &LibSqlRecordStore<'_>,
        metadata: &LibSqlMetadataStore<'_>,
        since: i64,
    ) -> Result<(usize, usize)> {
        let mut downloaded = 0;
        let mut failed_collections = 0;

        for collection in &self.settings.collections {
            // Failures are isolated: one collection falling over must not
            // stop the others from refreshing.
            match self.pull_collection(store, collection, since).await {
                Ok(count) => {
                    metadata
                        .set_collection_refreshed_at(collection, self.clock.now_ms())
                        .await?;
                    self.events.publish(SyncEvent::CacheUpdated {
                        collection: collection.clone(),
                        count,
                    });
                    downloaded += count;
                }
                Err(error) => {
                    failed_collections += 1;
                    tracing::warn!(
                        %collection,
                        %error,
                        "Download failed; keeping cached data"
                    );
                }
            }
        }

        Ok((downloaded, failed_collections))
    }

    async fn pull_collection(
        &self,
        store: &LibSqlRecordStore<'_>,
        collection: &str,
        since: i64,
    ) -> Result<usize> {
        let payloads = self.remote.fetch_since(collection, since).await?;
        let now = self.clock.now_ms();
        let mut saved = 0;

        for payload in payloads {
            match StoredRecord::from_payload(payload, now) {
                // Remote records overwrite local rows unconditionally:
                // last writer wins under the single-user-per-device model
                Ok(record) => {
                    store.save(collection, &record).await?;
                    saved += 1;
                }
                Err(error) => {
                    tracing::warn!(%collection, %error, "Skipping malformed remote record");
                }
            }
        }

        Ok(saved)
    }
}
