//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`ProgressCallback`] trait that long-running
//! operations report through, and [`Progress`], its terminal implementation.
//! Only one phase is active at a time, so a single bar slot is enough.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Phases of an inventory run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Counting files under the scan root
    Counting,
    /// Recording file metadata into the store
    Ingest,
    /// Hashing pending records, measured in bytes
    Hash,
    /// Writing the duplicate report, measured in member rows
    Report,
    /// Looking up hashes in a second inventory
    Compare,
}

impl Phase {
    /// Short name used in log lines.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counting => "counting",
            Self::Ingest => "ingest",
            Self::Hash => "hash",
            Self::Report => "report",
            Self::Compare => "compare",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Counting => "Counting files",
            Self::Ingest => "Recording files",
            Self::Hash => "Hashing",
            Self::Report => "Writing report",
            Self::Compare => "Comparing",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress callback for inventory phases.
///
/// Implement this trait to receive progress updates during ingestion,
/// hashing and reporting.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - The phase starting
    /// * `total` - Items in the phase, or bytes for [`Phase::Hash`]; 0 if unknown
    fn on_phase_start(&self, phase: Phase, total: u64);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Items processed so far in this phase
    /// * `path` - Path being processed
    fn on_progress(&self, _current: u64, _path: &str) {}

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: Phase);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    active: Mutex<Option<(Phase, ProgressBar)>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use threaded_inventory::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            active: Mutex::new(None),
            quiet,
        }
    }

    /// Whether output is suppressed.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn slot(&self) -> MutexGuard<'_, Option<(Phase, ProgressBar)>> {
        // A panic while holding the lock only leaves a stale bar behind.
        self.active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn count_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn bytes_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {bytes}/{total_bytes} {bytes_per_sec} {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn bar_for(phase: Phase, total: u64) -> ProgressBar {
        match phase {
            Phase::Counting => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::spinner_style());
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            Phase::Hash => {
                let pb = ProgressBar::new(total);
                pb.set_style(Self::bytes_style());
                pb
            }
            Phase::Ingest if total == 0 => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::spinner_style());
                pb
            }
            Phase::Ingest | Phase::Report | Phase::Compare => {
                let pb = ProgressBar::new(total);
                pb.set_style(Self::count_style());
                pb
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: Phase, total: u64) {
        if self.quiet {
            return;
        }

        let pb = Self::bar_for(phase, total);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_message(phase.label());
        if let Some((_, old)) = self.slot().replace((phase, pb)) {
            old.finish_and_clear();
        }
    }

    fn on_progress(&self, current: u64, path: &str) {
        if self.quiet {
            return;
        }

        if let Some((phase, pb)) = self.slot().as_ref() {
            // Hash progress advances by bytes in on_item_completed.
            if *phase != Phase::Hash {
                pb.set_position(current);
            }
            pb.set_message(truncate_path(path, 30));
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        if self.quiet {
            return;
        }

        if let Some((Phase::Hash, pb)) = self.slot().as_ref() {
            pb.inc(bytes);
        }
    }

    fn on_phase_end(&self, phase: Phase) {
        if self.quiet {
            return;
        }

        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|(active, _)| *active == phase) {
            if let Some((_, pb)) = slot.take() {
                pb.finish_with_message(format!("{} complete", phase.label()));
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Some((_, pb)) = self.slot().as_ref() {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
