//! Report artifacts written next to the inventory database.
//!
//! - `<database>_bad_paths.tsv`: one unreadable path per line, after ingestion
//! - `<database minus .db>_duplicate_report.tsv`: the duplicate report ([`tsv`])
//! - comparison results as JSON ([`json`])

pub mod json;
pub mod tsv;

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::store::StoreError;

pub use json::JsonCompareOutput;
pub use tsv::{DuplicateReport, ReportStats};

/// Errors while writing a report artifact.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The artifact file could not be created.
    #[error("Cannot create {path}: {source}")]
    Create {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during TSV serialization.
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error during JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Path of the bad-paths artifact: the database path with
/// `_bad_paths.tsv` appended.
#[must_use]
pub fn bad_paths_path(database: &Path) -> PathBuf {
    let mut name = OsString::from(database.as_os_str());
    name.push("_bad_paths.tsv");
    PathBuf::from(name)
}

/// Path of the duplicate report: the database path without a trailing
/// `.db`, with `_duplicate_report.tsv` appended.
#[must_use]
pub fn duplicate_report_path(database: &Path) -> PathBuf {
    let base = if database.extension().is_some_and(|ext| ext == "db") {
        database.with_extension("")
    } else {
        database.to_path_buf()
    };
    let mut name = base.into_os_string();
    name.push("_duplicate_report.tsv");
    PathBuf::from(name)
}

/// Write one path per line, replacing `target`.
///
/// # Errors
///
/// Returns `ReportError` if the file cannot be created or written.
pub fn write_bad_paths(target: &Path, paths: &[PathBuf]) -> Result<(), ReportError> {
    let file = File::create(target).map_err(|source| ReportError::Create {
        path: target.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    for path in paths {
        writeln!(out, "{}", path.display())?;
    }
    out.flush()?;
    log::info!("Wrote {} bad paths to {}", paths.len(), target.display());
    Ok(())
}
