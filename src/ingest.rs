//! Ingestion of a directory tree into the record store.
//!
//! The walker's output is buffered into [`NewRecord`]s and flushed in
//! chunks of at most `batch_size` records, one transaction per chunk. A
//! crash therefore loses at most the chunk in flight. Paths that cannot be
//! read are collected instead of stored, so one bad file never stops a run.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::progress::{Phase, ProgressCallback};
use crate::scanner::{Walker, WalkerConfig};
use crate::store::{InventoryStore, NewRecord, StoreResult, DEFAULT_MAX_INSERT_BATCH};

/// Configuration for one ingestion run.
#[derive(Clone)]
pub struct IngestConfig {
    /// Records per insert transaction.
    pub batch_size: usize,
    /// Traversal options, including the excludes list.
    pub walker: WalkerConfig,
    /// Run a counting pass first so progress has a total.
    pub count_first: bool,
    /// Optional shutdown flag, checked between chunks.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestConfig")
            .field("batch_size", &self.batch_size)
            .field("walker", &self.walker)
            .field("count_first", &self.count_first)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_MAX_INSERT_BATCH,
            walker: WalkerConfig::default(),
            count_first: true,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl IngestConfig {
    /// Set the number of records per insert transaction.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the directories pruned from traversal.
    #[must_use]
    pub fn with_excludes(mut self, excludes: Vec<PathBuf>) -> Self {
        self.walker.excludes = excludes;
        self
    }

    /// Enable or disable the counting pass.
    #[must_use]
    pub fn with_count_first(mut self, count_first: bool) -> Self {
        self.count_first = count_first;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records written to the store
    pub files_recorded: u64,
    /// Sum of recorded file sizes
    pub bytes_recorded: u64,
    /// Insert transactions committed
    pub batches: u64,
    /// Paths that could not be read, in traversal order
    pub bad_paths: Vec<PathBuf>,
    /// Whether the run stopped on a shutdown request
    pub interrupted: bool,
}

/// Feeds traversal output into a store.
#[derive(Debug, Default)]
pub struct Ingestor {
    config: IngestConfig,
}

impl Ingestor {
    /// Create an ingestor with the given configuration.
    #[must_use]
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Walk `root` and append one record per readable file to `store`.
    ///
    /// # Errors
    ///
    /// Returns a store error if a chunk cannot be committed. Chunks
    /// committed before the failure stay in the store.
    pub fn ingest(&self, store: &mut InventoryStore, root: &Path) -> StoreResult<IngestStats> {
        let cap = self.config.batch_size.min(store.max_insert_batch()).max(1);
        let mut walker = Walker::new(root, self.config.walker.clone());
        if let Some(flag) = &self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        let callback = self.config.progress_callback.as_deref();
        let total = if self.config.count_first {
            if let Some(cb) = callback {
                cb.on_phase_start(Phase::Counting, 0);
            }
            let total = walker.count_files();
            if let Some(cb) = callback {
                cb.on_phase_end(Phase::Counting);
            }
            total
        } else {
            0
        };

        log::info!("Ingesting {} into {}", root.display(), store.path().display());
        if let Some(cb) = callback {
            cb.on_phase_start(Phase::Ingest, total);
        }

        let mut stats = IngestStats::default();
        let mut pending: Vec<NewRecord> = Vec::with_capacity(cap);
        let mut seen = 0u64;

        for item in walker.walk() {
            seen += 1;
            match item {
                Ok(entry) => {
                    if let Some(cb) = callback {
                        cb.on_progress(seen, entry.path.to_string_lossy().as_ref());
                    }
                    pending.push(NewRecord::from(entry));
                }
                Err(e) => stats.bad_paths.push(e.path().to_path_buf()),
            }

            if pending.len() >= cap {
                self.flush(store, &mut pending, &mut stats)?;
                if self.config.is_shutdown_requested() {
                    break;
                }
            }
        }
        self.flush(store, &mut pending, &mut stats)?;

        if self.config.is_shutdown_requested() {
            stats.interrupted = true;
            log::info!("Ingestion interrupted by shutdown signal");
        }
        if let Some(cb) = callback {
            cb.on_phase_end(Phase::Ingest);
        }

        log::info!(
            "Ingested {} files ({}) in {} batches, {} bad paths",
            stats.files_recorded,
            bytesize::ByteSize::b(stats.bytes_recorded),
            stats.batches,
            stats.bad_paths.len()
        );
        Ok(stats)
    }

    fn flush(
        &self,
        store: &mut InventoryStore,
        pending: &mut Vec<NewRecord>,
        stats: &mut IngestStats,
    ) -> StoreResult<()> {
        if pending.is_empty() {
            return Ok(());
        }
        let written = store.insert_batch(pending)?;
        stats.files_recorded += written as u64;
        stats.bytes_recorded += pending.iter().map(|r| r.file_size).sum::<u64>();
        stats.batches += 1;
        pending.clear();
        Ok(())
    }
}
