//! CLI argument definitions using clap
//!
//! This module contains the clap structs for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Recur - Find the charges that keep coming back
#[derive(Parser)]
#[command(name = "recur")]
#[command(about = "Recurring charge detection and prediction", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/recur/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Holiday locale: us, gb, none (overrides the config file)
    #[arg(long, global = true)]
    pub locale: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect recurring charges in a transaction CSV
    Detect {
        /// CSV file with date, amount and description columns
        #[arg(short, long)]
        file: PathBuf,

        /// Discard patterns scoring below this (0-1)
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Minimum occurrences for a pattern (at least 3)
        #[arg(long)]
        min_occurrences: Option<usize>,

        /// Only consider transactions on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only consider transactions on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Stop after this many seconds and report what finished
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Predict upcoming occurrences of detected charges
    Predict {
        /// CSV file with date, amount and description columns
        #[arg(short, long)]
        file: PathBuf,

        /// Reference date (YYYY-MM-DD, defaults to the latest transaction)
        #[arg(long)]
        as_of: Option<String>,

        /// Occurrences to predict per pattern
        #[arg(short, long, default_value = "3")]
        count: usize,

        /// Print the predictions as JSON
        #[arg(long)]
        json: bool,
    },

    /// List public holidays used for working-day decisions
    Holidays {
        /// Calendar year
        #[arg(short, long)]
        year: i32,
    },
}
