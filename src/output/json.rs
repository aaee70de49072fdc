//! JSON output for cross-inventory comparisons.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "first": "/data/laptop.db",
//!   "second": "/data/backup.db",
//!   "candidates": 12,
//!   "matches": [
//!     {
//!       "hash": "af1349b9...",
//!       "first_examples": ["/home/me/a.jpg", "/home/me/b.jpg"],
//!       "second_examples": ["/mnt/backup/a.jpg"]
//!     }
//!   ]
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::compare::{CompareReport, CrossMatch};

/// Comparison result with the inventories it came from.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCompareOutput<'a> {
    /// First inventory path
    pub first: &'a Path,
    /// Second inventory path
    pub second: &'a Path,
    /// Duplicate hashes examined
    pub candidates: u64,
    /// Matches in first-inventory duplicate order
    pub matches: &'a [CrossMatch],
}

impl<'a> JsonCompareOutput<'a> {
    /// Wrap a report for serialization.
    #[must_use]
    pub fn new(first: &'a Path, second: &'a Path, report: &'a CompareReport) -> Self {
        Self {
            first,
            second,
            candidates: report.candidates,
            matches: &report.matches,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if a path is not valid UTF-8.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if a path is not valid UTF-8.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), super::ReportError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
