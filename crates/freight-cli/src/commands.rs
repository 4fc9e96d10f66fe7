use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "freight")]
#[command(version, about = "Stage and migrate home directories to a new server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the global config for a migration root and destination
    Init {
        /// Migration root (prompted for when omitted; Enter uses the current directory)
        directory: Option<PathBuf>,
    },
    /// Scan every candidate directory that changed since its last scan
    Scan {
        /// Migration root (defaults to the configured root)
        migration_root: Option<PathBuf>,
    },
    /// Show statistics and per-directory status
    Overview {
        migration_root: Option<PathBuf>,
        /// Print the overview document as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the clean tool over the migration root
    Clean {
        migration_root: Option<PathBuf>,
        /// Actually remove files instead of reporting what would be removed
        #[arg(long)]
        confirm: bool,
        /// Extra arguments passed through to the clean tool
        #[arg(last = true)]
        script_args: Vec<String>,
    },
    /// Find directory names repeated across candidates
    Shared {
        migration_root: Option<PathBuf>,
        /// Minimum number of candidates a name must appear in
        #[arg(long)]
        threshold: Option<usize>,
    },
    /// Transfer scanned directories to the destination, smallest first
    Migrate {
        migration_root: Option<PathBuf>,
        /// Execute the transfer after confirmation instead of a dry run
        #[arg(long)]
        confirm: bool,
    },
}
