//! Content-hash pipeline over the record store.
//!
//! # Overview
//!
//! The pipeline drains pending records page by page, largest file first:
//!
//! 1. The total pending bytes size a byte-based progress phase.
//! 2. Each page (default 1000 records) is handed to a producer thread that
//!    hashes the records in order and sends one [`HashOutcome`] per record
//!    into a bounded channel (default depth 8). A full channel blocks the
//!    producer.
//! 3. The calling thread consumes outcomes in the order they were produced,
//!    writes them back with [`InventoryStore::update`] and advances
//!    progress by the bytes hashed.
//!
//! A record whose file cannot be read is stored as hashed with an empty
//! hash. It leaves the unhashed set, so every run terminates; the
//! [`PendingFilter::EmptyHash`] target retries such records explicitly.
//!
//! # Example
//!
//! ```no_run
//! use threaded_inventory::pipeline::{HashPipeline, PipelineConfig};
//! use threaded_inventory::store::InventoryStore;
//! use std::path::Path;
//!
//! let store = InventoryStore::open(Path::new("inventory.db")).unwrap();
//! let stats = HashPipeline::new(&store, PipelineConfig::default()).run().unwrap();
//! println!("{} hashed, {} failed", stats.hashed_files, stats.failed_files);
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use bytesize::ByteSize;
use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::progress::{Phase, ProgressCallback};
use crate::scanner::{Hasher, PathStyle};
use crate::store::{InventoryStore, PendingFilter, Record, StoreError};

/// Default number of records drawn from the store per page.
pub const DEFAULT_HASH_BATCH_SIZE: usize = 1000;

/// Default number of hash results the producer may run ahead.
pub const DEFAULT_PREFETCH_DEPTH: usize = 8;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The store rejected a read or a write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The producer thread could not be started.
    #[error("Failed to start hash worker: {0}")]
    Spawn(#[source] io::Error),

    /// The producer thread panicked.
    #[error("Hash worker thread panicked")]
    WorkerPanicked,
}

/// Configuration for a pipeline run.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Records drawn from the store per page.
    pub batch_size: usize,
    /// Depth of the lookahead queue between producer and consumer.
    pub prefetch_depth: usize,
    /// Which records are pending.
    pub target: PendingFilter,
    /// How stored paths are re-opened.
    pub path_style: PathStyle,
    /// Hasher used by the producer.
    pub hasher: Hasher,
    /// Optional shutdown flag, checked between pages.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("batch_size", &self.batch_size)
            .field("prefetch_depth", &self.prefetch_depth)
            .field("target", &self.target)
            .field("path_style", &self.path_style)
            .field("hasher", &self.hasher)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_HASH_BATCH_SIZE,
            prefetch_depth: DEFAULT_PREFETCH_DEPTH,
            target: PendingFilter::Unhashed,
            path_style: PathStyle::Native,
            hasher: Hasher::new(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl PipelineConfig {
    /// Set the page size.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the lookahead queue depth.
    #[must_use]
    pub fn with_prefetch_depth(mut self, depth: usize) -> Self {
        self.prefetch_depth = depth.max(1);
        self
    }

    /// Select the pending records.
    #[must_use]
    pub fn with_target(mut self, target: PendingFilter) -> Self {
        self.target = target;
        self
    }

    /// Set the path style used to re-open files.
    #[must_use]
    pub fn with_path_style(mut self, style: PathStyle) -> Self {
        self.path_style = style;
        self
    }

    /// Set the hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
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

/// One producer result: the record, its digest (empty on failure) and the
/// bytes read while hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOutcome {
    /// The record as read from the store
    pub record: Record,
    /// Hex digest, or empty if the file could not be read
    pub hash: String,
    /// Bytes read, zero on failure
    pub size: u64,
}

/// Statistics from one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Pending bytes reported by the store before the run
    pub total_bytes: u64,
    /// Records hashed successfully
    pub hashed_files: u64,
    /// Records stored with an empty hash
    pub failed_files: u64,
    /// Paths of the failed records
    pub failed_paths: Vec<PathBuf>,
    /// Bytes read by successful hashes
    pub bytes_hashed: u64,
    /// Pages drawn from the store
    pub batches: u64,
    /// Whether the run stopped on a shutdown request
    pub interrupted: bool,
}

impl PipelineStats {
    /// Records processed, successful or not.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.hashed_files + self.failed_files
    }
}

/// Hash one record, absorbing I/O failures into an empty hash.
#[must_use]
pub fn hash_record(hasher: &Hasher, style: PathStyle, record: Record) -> HashOutcome {
    let result = hasher.hash_file(&style.apply(record.path()));
    match result {
        Ok(out) => HashOutcome {
            record,
            hash: out.digest,
            size: out.bytes,
        },
        Err(e) => {
            log::warn!("Cannot hash {}: {}", record.file_path, e);
            HashOutcome {
                record,
                hash: String::new(),
                size: 0,
            }
        }
    }
}

/// Hash pipeline bound to one store.
pub struct HashPipeline<'a> {
    store: &'a InventoryStore,
    config: PipelineConfig,
}

impl<'a> HashPipeline<'a> {
    /// Create a pipeline over `store`.
    #[must_use]
    pub fn new(store: &'a InventoryStore, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Hash every pending record.
    ///
    /// With nothing pending this performs no writes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the store fails or the worker cannot run.
    /// Records persisted before the failure keep their hashes.
    pub fn run(&self) -> Result<PipelineStats, PipelineError> {
        let target = self.config.target;
        let total = self.store.sum_pending_bytes(target)?;
        let mut stats = PipelineStats {
            total_bytes: total,
            ..Default::default()
        };

        log::info!("Hashing {} of pending content ({:?})", ByteSize::b(total), target);
        let callback = self.config.progress_callback.as_deref();
        if let Some(cb) = callback {
            cb.on_phase_start(Phase::Hash, total);
        }

        let mut cursor = None;
        loop {
            if self.config.is_shutdown_requested() {
                stats.interrupted = true;
                log::info!("Hash pipeline interrupted by shutdown signal");
                break;
            }

            let batch =
                self.store
                    .select_pending(target, cursor.as_ref(), self.config.batch_size)?;
            let Some(last) = batch.last() else {
                break;
            };
            cursor = Some(last.cursor());
            stats.batches += 1;
            log::debug!(
                "Batch {}: {} records, largest {}",
                stats.batches,
                batch.len(),
                ByteSize::b(batch[0].file_size)
            );

            self.process_batch(batch, &mut stats)?;
        }

        if let Some(cb) = callback {
            cb.on_phase_end(Phase::Hash);
        }
        log::info!(
            "Hashed {} files ({}), {} failed",
            stats.hashed_files,
            ByteSize::b(stats.bytes_hashed),
            stats.failed_files
        );
        Ok(stats)
    }

    fn process_batch(
        &self,
        batch: Vec<Record>,
        stats: &mut PipelineStats,
    ) -> Result<(), PipelineError> {
        let (tx, rx) = crossbeam_channel::bounded(self.config.prefetch_depth.max(1));
        let hasher = &self.config.hasher;
        let style = self.config.path_style;

        thread::scope(|scope| {
            let producer = thread::Builder::new()
                .name("hash-producer".into())
                .spawn_scoped(scope, move || produce(batch, hasher, style, tx))
                .map_err(PipelineError::Spawn)?;

            // rx is dropped when consume returns, which unblocks the producer
            // if the consumer stopped early.
            let consumed = self.consume(rx, stats);
            let joined = producer.join().map_err(|_| PipelineError::WorkerPanicked);
            consumed.and(joined)
        })
    }

    fn consume(
        &self,
        rx: Receiver<HashOutcome>,
        stats: &mut PipelineStats,
    ) -> Result<(), PipelineError> {
        let callback = self.config.progress_callback.as_deref();

        for HashOutcome {
            mut record,
            hash,
            size,
        } in rx
        {
            let failed = hash.is_empty();
            record.content_hash = hash;
            record.hashed = true;
            self.store.update(&record)?;

            if failed {
                stats.failed_files += 1;
                stats.failed_paths.push(PathBuf::from(&record.file_path));
            } else {
                stats.hashed_files += 1;
                stats.bytes_hashed += size;
            }
            if let Some(cb) = callback {
                cb.on_item_completed(size);
                cb.on_progress(stats.processed(), &record.file_path);
            }
        }
        Ok(())
    }
}

fn produce(batch: Vec<Record>, hasher: &Hasher, style: PathStyle, tx: Sender<HashOutcome>) {
    for record in batch {
        let outcome = hash_record(hasher, style, record);
        if tx.send(outcome).is_err() {
            log::debug!("Consumer stopped, abandoning the rest of the batch");
            break;
        }
    }
}
