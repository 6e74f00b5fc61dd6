//! Shelfkeep CLI - backup and restore for a shelfkeep library.
//!
//! # Commands
//!
//! - `create` - Write a backup of the library
//! - `restore` - Merge a backup into the library
//! - `inspect` - Summarize a backup file
//! - `prune` - Delete old generated backups
//!
//! Configuration comes from the environment (and a `.env` file, if present);
//! see [`config::Config`].

mod commands;
mod config;
mod error;
mod library;

use crate::config::Config;
use crate::error::Result;
use clap::{Parser, Subcommand};
use shelfkeep_engine::BackupOptions;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Backup and restore tools for shelfkeep libraries.
#[derive(Parser)]
#[command(name = "shelfkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a backup of the library
    Create {
        /// Backup file to write (defaults to a generated name in the backup dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave units out of the backup
        #[arg(long)]
        no_units: bool,

        /// Leave categories and memberships out of the backup
        #[arg(long)]
        no_categories: bool,

        /// Leave tracking records out of the backup
        #[arg(long)]
        no_tracks: bool,
    },

    /// Merge a backup file into the library
    Restore {
        /// Backup file to restore
        file: PathBuf,
    },

    /// Summarize a backup file without restoring it
    Inspect {
        /// Backup file to inspect
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete old generated backups
    Prune {
        /// Number of backups to keep (defaults to SHELFKEEP_MAX_BACKUPS)
        #[arg(short, long)]
        keep: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelfkeep=info,shelfkeep_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Create {
            output,
            no_units,
            no_categories,
            no_tracks,
        } => {
            let options = BackupOptions {
                units: !no_units,
                categories: !no_categories,
                tracks: !no_tracks,
            };
            commands::backup::create(&load_config()?, output, options).await?;
        }
        Commands::Restore { file } => {
            commands::backup::restore(&load_config()?, &file).await?;
        }
        Commands::Inspect { file, json } => {
            commands::inspect::run(&file, json).await?;
        }
        Commands::Prune { keep } => {
            commands::prune::run(&load_config()?, keep).await?;
        }
    }
    Ok(())
}

/// Load configuration, reading `.env` first when present.
fn load_config() -> Result<Config> {
    dotenvy::dotenv().ok();
    Ok(Config::from_env()?)
}
