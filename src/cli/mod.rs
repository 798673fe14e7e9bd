//! Command-line interface for the mexicapp backend.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mexicapp - location discovery backend
#[derive(Parser)]
#[command(name = "mexicapp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API with the maintenance scheduler (default)
    #[command(alias = "daemon")]
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Load moods and demo venues
    Seed {
        /// TOML file with `[[moods]]` and `[[venues]]` tables
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Delete expired tokens, sessions and stale login counters once
    Purge {
        /// Keep expired rows this many days (defaults to the scheduler setting)
        #[arg(long)]
        retention_days: Option<i64>,
    },

    /// Create default config file
    #[command(alias = "init")]
    InitConfig,
}

pub use commands::*;
