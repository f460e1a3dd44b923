//! Command-line interface for Steamboat.

mod commands;

use clap::{Parser, Subcommand};

/// Steamboat - Steam library sharing service
#[derive(Parser)]
#[command(name = "steamboat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run bootstrap, the scheduler and the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Sync every linked Steam account once
    SyncAll,

    /// Backfill missing game prices once
    SyncPrices,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
