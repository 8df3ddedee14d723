//! Snapcow CLI
//!
//! Command-line tools for COW snapshot containers.
//!
//! # Commands
//!
//! - `inspect` - Display container header and operation listing
//! - `verify` - Verify container integrity

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// COW snapshot container tools.
#[derive(Parser)]
#[command(name = "snapcow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display container header and operation listing
    Inspect {
        /// Path to the COW container
        file: PathBuf,

        /// List every operation record
        #[arg(short, long)]
        ops: bool,
    },

    /// Verify container integrity
    Verify {
        /// Path to the COW container
        file: PathBuf,

        /// Also decompress every payload
        #[arg(short, long)]
        data: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { file, ops } => {
            commands::inspect::run(&file, ops)?;
        }
        Commands::Verify { file, data } => {
            commands::verify::run(&file, data)?;
        }
        Commands::Version => {
            println!("snapcow v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
