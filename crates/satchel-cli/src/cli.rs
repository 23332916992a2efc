use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use satchel_core::Priority;

#[derive(Parser)]
#[command(name = "satchel")]
#[command(about = "Inspect and sync the Satchel offline store from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Remote API base URL (falls back to SATCHEL_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a record locally and queue the matching mutation
    #[command(alias = "new")]
    Add {
        /// Target collection (e.g. activities)
        collection: String,
        /// Record payload as JSON; an id is minted when missing
        payload: String,
        /// Queue priority for the mutation
        #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
    },
    /// Show a single record
    Get {
        /// Collection name
        collection: String,
        /// Record id
        id: String,
    },
    /// List records in a collection, newest first
    List {
        /// Collection name
        collection: String,
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a record locally and queue the deletion
    Delete {
        /// Collection name
        collection: String,
        /// Record id
        id: String,
    },
    /// Inspect the pending-mutation queue
    Queue {
        #[command(subcommand)]
        command: Option<QueueCommands>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one sync round against the remote API
    Sync {
        /// Output the round report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show queue depth and freshness metadata
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the periodic sync engine until interrupted
    Watch {
        /// Seconds between periodic rounds
        #[arg(long, default_value = "300")]
        interval: u64,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Drop every pending mutation
    Clear,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PriorityArg {
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::High => Self::High,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::Low => Self::Low,
        }
    }
}
