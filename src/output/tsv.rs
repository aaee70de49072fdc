//! Tab-separated duplicate report.
//!
//! # Layout
//!
//! ```text
//! Hash<TAB>Count<TAB>Filename
//! <hash><TAB><count><TAB><first member path>
//! <TAB><TAB><member path>
//! <TAB><TAB><member path>
//! ...
//! ```
//!
//! Groups appear in duplicate-finder order (largest group first) and every
//! member of a group is listed, the first one included.
//!
//! # Example
//!
//! ```no_run
//! use threaded_inventory::duplicates::DuplicateFinder;
//! use threaded_inventory::output::tsv::DuplicateReport;
//! use threaded_inventory::store::InventoryStore;
//! use std::path::Path;
//!
//! let store = InventoryStore::open(Path::new("inventory.db")).unwrap();
//! let report = DuplicateReport::new(DuplicateFinder::new(&store));
//! report.write_to(std::io::stdout()).unwrap();
//! ```

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use csv::{QuoteStyle, WriterBuilder};

use super::ReportError;
use crate::duplicates::DuplicateFinder;
use crate::progress::{Phase, ProgressCallback};

/// Header row of the report.
pub const REPORT_HEADER: [&str; 3] = ["Hash", "Count", "Filename"];

/// Counts from one report run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    /// Groups written
    pub groups: u64,
    /// Member rows written
    pub members: u64,
}

/// Duplicate report writer.
pub struct DuplicateReport<'a> {
    finder: DuplicateFinder<'a>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl<'a> DuplicateReport<'a> {
    /// Create a report over the finder's groups.
    #[must_use]
    pub fn new(finder: DuplicateFinder<'a>) -> Self {
        Self {
            finder,
            progress_callback: None,
        }
    }

    /// Set the progress callback. Progress is measured in member rows.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Write the report to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if a query or a write fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<ReportStats, ReportError> {
        let mut out = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(writer);

        let callback = self.progress_callback.as_deref();
        if let Some(cb) = callback {
            let totals = self.finder.summary()?;
            cb.on_phase_start(Phase::Report, totals.duplicate_files);
        }

        out.write_record(REPORT_HEADER)?;
        let mut stats = ReportStats::default();
        for group in self.finder.pages() {
            let group = self.finder.expand(group?)?;
            let count = group.count.to_string();
            out.write_record([
                group.hash.as_str(),
                count.as_str(),
                group.first_path().unwrap_or_default(),
            ])?;
            for member in &group.members {
                out.write_record(["", "", member.file_path.as_str()])?;
            }

            stats.groups += 1;
            stats.members += group.members.len() as u64;
            if let Some(cb) = callback {
                cb.on_progress(stats.members, group.first_path().unwrap_or_default());
            }
        }
        out.flush()?;

        if let Some(cb) = callback {
            cb.on_phase_end(Phase::Report);
        }
        Ok(stats)
    }

    /// Write the report to a file, replacing it.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if the file cannot be created or written.
    pub fn write_file(&self, path: &Path) -> Result<ReportStats, ReportError> {
        let file = File::create(path).map_err(|source| ReportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        let stats = self.write_to(file)?;
        log::info!(
            "Wrote {} duplicate groups ({} files) to {}",
            stats.groups,
            stats.members,
            path.display()
        );
        Ok(stats)
    }
}
