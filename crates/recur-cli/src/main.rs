//! Recur CLI - Recurring charge detector
//!
//! Usage:
//!   recur detect --file CSV        Detect recurring charges
//!   recur predict --file CSV       Predict upcoming occurrences
//!   recur holidays --year 2025     List public holidays for a locale

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_settings(cli.config.as_deref(), cli.locale.as_deref())?;

    match cli.command {
        Commands::Detect {
            file,
            min_confidence,
            min_occurrences,
            from,
            to,
            timeout_secs,
            json,
        } => {
            let options = commands::build_options(
                &config,
                min_confidence,
                min_occurrences,
                from.as_deref(),
                to.as_deref(),
            )?;
            commands::cmd_detect(
                &config,
                &file,
                &options,
                timeout_secs.map(Duration::from_secs),
                json,
            )
        }
        Commands::Predict {
            file,
            as_of,
            count,
            json,
        } => commands::cmd_predict(&config, &file, as_of.as_deref(), count, json),
        Commands::Holidays { year } => commands::cmd_holidays(config.locale, year),
    }
}
