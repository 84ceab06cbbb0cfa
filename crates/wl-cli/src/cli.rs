//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::aggregate::AggregateArgs;
use crate::commands::history::HistoryArgs;
use crate::commands::send::SendArgs;

/// Turns a branch checkout log into Jira worklogs.
///
/// Branch samples and pause markers are appended to a JSON Lines log, then
/// aggregated into worklog blocks, reconciled with calendar meetings and
/// submitted to Jira.
#[derive(Debug, Parser)]
#[command(name = "wl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Aggregate the log and print the resulting blocks.
    Aggregate(AggregateArgs),

    /// Aggregate the log and submit the blocks to Jira.
    Send(SendArgs),

    /// Append an entry to the log.
    Mark {
        #[command(subcommand)]
        entry: MarkEntry,
    },

    /// List past submissions.
    History(HistoryArgs),

    /// Show log and ledger status.
    Status,
}

/// Entries that can be appended to the log.
#[derive(Debug, Subcommand)]
pub enum MarkEntry {
    /// Record that a branch is checked out now.
    Branch {
        /// Branch name; anything up to the last `/` is dropped.
        name: String,
    },

    /// Record that work stopped now.
    Pause,
}
