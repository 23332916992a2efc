use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use satchel_core::net::{HttpRemoteApi, NetworkMonitor};
use satchel_core::{EventBus, SyncEvent, SyncManager, SyncReport, SystemClock};

use crate::commands::common::{open_database, resolve_settings};
use crate::error::CliError;

pub async fn run_sync(
    as_json: bool,
    api_url: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let settings = resolve_settings(api_url)?;
    let db = Arc::new(open_database(db_path).await?);
    let events = EventBus::default();
    // The CLI assumes connectivity; unreachable hosts surface as deferred
    // uploads and failed downloads in the report.
    let monitor = Arc::new(NetworkMonitor::new(true, events.clone()));
    let remote = HttpRemoteApi::new(&settings)?;

    let manager = SyncManager::new(db, remote, SystemClock, settings, events, monitor);

    match manager.sync().await? {
        Some(report) if as_json => println!("{}", serde_json::to_string_pretty(&report)?),
        Some(report) => print_report(&report),
        None => println!("Sync already in flight."),
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.advanced {
        println!(
            "Sync completed: {} uploaded, {} deferred, {} dropped, {} downloaded ({} collection(s) failed), {} pending",
            report.uploaded,
            report.deferred,
            report.dropped,
            report.downloaded,
            report.failed_collections,
            report.pending
        );
    } else {
        println!(
            "Sync made no progress: {} collection(s) failed, {} mutation(s) still pending",
            report.failed_collections, report.pending
        );
    }
}

pub async fn run_watch(
    interval_secs: u64,
    api_url: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let settings = resolve_settings(api_url)?
        .with_sync_interval(Duration::from_secs(interval_secs));
    let db = Arc::new(open_database(db_path).await?);
    let events = EventBus::default();
    let monitor = Arc::new(NetworkMonitor::new(true, events.clone()));
    let remote = HttpRemoteApi::new(&settings)?;

    let manager = SyncManager::new(
        db,
        remote,
        SystemClock,
        settings,
        events.clone(),
        monitor,
    );

    let mut receiver = events.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => print_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("Watching; syncing every {interval_secs}s. Ctrl-C to stop.");
    manager.run().await;

    printer.abort();
    Ok(())
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::SyncStarted => println!("sync started"),
        SyncEvent::SyncCompleted {
            uploaded,
            dropped,
            downloaded,
            failed_collections,
        } => println!(
            "sync completed: {uploaded} uploaded, {dropped} dropped, {downloaded} downloaded, {failed_collections} collection(s) failed"
        ),
        SyncEvent::SyncFailed { reason } => println!("sync failed: {reason}"),
        SyncEvent::MutationDropped {
            collection,
            mutation,
            reason,
            ..
        } => println!("dropped {mutation} on {collection}: {reason}"),
        SyncEvent::CacheUpdated { collection, count } => {
            println!("refreshed {collection}: {count} record(s)");
        }
        SyncEvent::Online => println!("online"),
        SyncEvent::Offline => println!("offline"),
        SyncEvent::DataUpdated { .. } | SyncEvent::SyncQueueUpdated { .. } => {}
    }
}
