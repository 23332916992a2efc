//! Satchel CLI - inspect and sync the offline store from the command line

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands, QueueCommands};
use crate::commands::common::resolve_db_path;
use crate::commands::{add, delete, list, queue, status, sync};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("satchel=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Add {
            collection,
            payload,
            priority,
        } => add::run_add(&collection, &payload, priority.into(), &db_path).await?,
        Commands::Get { collection, id } => list::run_get(&collection, &id, &db_path).await?,
        Commands::List {
            collection,
            limit,
            json,
        } => list::run_list(&collection, limit, json, &db_path).await?,
        Commands::Delete { collection, id } => {
            delete::run_delete(&collection, &id, &db_path).await?;
        }
        Commands::Queue { command, json } => match command {
            Some(QueueCommands::Clear) => queue::run_queue_clear(&db_path).await?,
            None => queue::run_queue_list(json, &db_path).await?,
        },
        Commands::Sync { json } => sync::run_sync(json, cli.api_url, &db_path).await?,
        Commands::Status { json } => status::run_status(json, &db_path).await?,
        Commands::Watch { interval } => {
            sync::run_watch(interval, cli.api_url, &db_path).await?;
        }
    }

    Ok(())
}
