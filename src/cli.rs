//! Command-line interface definitions.
//!
//! The default form runs one pass over one inventory; maintenance and
//! comparison are subcommands. Global options may appear anywhere.
//!
//! # Example
//!
//! ```bash
//! # Pass 1: record every file under /srv/data, then hash them
//! inventory data.db /srv/data 1 excludes.txt
//!
//! # Pass 2: resume hashing whatever is still pending
//! inventory data.db /srv/data 2
//!
//! # Pass 3: write data_duplicate_report.tsv
//! inventory data.db /srv/data 3
//!
//! # Duplicates of data.db that also exist in backup.db
//! inventory compare data.db backup.db --output shared.json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Content-addressed file inventory.
///
/// Records every file under a scan root in a SQLite inventory, hashes
/// contents in the background, and reports duplicates within one inventory
/// or shared between two.
#[derive(Debug, Parser)]
#[command(name = "inventory")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    /// Inventory database file
    #[arg(value_name = "DATABASE", required = true)]
    pub database: Option<PathBuf>,

    /// Directory tree to inventory
    #[arg(value_name = "SCAN_ROOT", required = true)]
    pub scan_root: Option<PathBuf>,

    /// Pass to run: 1 ingest and hash, 2 hash only, 3 duplicate report
    #[arg(value_name = "PASS", value_enum, required = true)]
    pub pass: Option<Pass>,

    /// Newline-delimited list of directories to skip
    #[arg(value_name = "EXCLUDES")]
    pub excludes: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Read settings from this TOML file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Disable progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Maintenance or comparison subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Passes of the default form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pass {
    /// Ingest the scan root, write the bad-paths file, then hash
    #[value(name = "1")]
    Ingest,
    /// Hash pending records only
    #[value(name = "2")]
    Hash,
    /// Write the duplicate report
    #[value(name = "3")]
    Report,
}

impl Pass {
    /// The pass number as typed on the command line.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Ingest => 1,
            Self::Hash => 2,
            Self::Report => 3,
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find duplicates of FIRST that also exist in SECOND
    Compare(CompareArgs),
    /// Delete records whose hash attempt failed permanently
    PurgeFailed(DatabaseArgs),
    /// Hash again every record whose hash is empty
    RetryFailed(DatabaseArgs),
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Inventory whose duplicate hashes are examined
    #[arg(value_name = "FIRST")]
    pub first: PathBuf,

    /// Inventory probed for each duplicate hash
    #[arg(value_name = "SECOND")]
    pub second: PathBuf,

    /// Write JSON here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Keep one connection per inventory open for the whole run
    #[arg(long)]
    pub persistent: bool,

    /// Example paths per side (overrides the configuration)
    #[arg(long, value_name = "N")]
    pub examples: Option<usize>,
}

/// Arguments for subcommands acting on one inventory.
#[derive(Debug, Args)]
pub struct DatabaseArgs {
    /// Inventory database file
    #[arg(value_name = "DATABASE")]
    pub database: PathBuf,
}
