//! Cross-inventory comparison.
//!
//! Finds content hashes that are duplicated within a first inventory and
//! present at least once in a second, independently scanned one, and
//! samples example paths from both sides for manual review.
//!
//! Both stores are opened read-only. Under the default
//! [`ConnectionPolicy::PerLookup`] each probe opens and closes its own
//! connection, so a long comparison never pins either database file.
//!
//! # Example
//!
//! ```no_run
//! use threaded_inventory::compare::{CompareConfig, InventoryComparator};
//! use std::path::Path;
//!
//! let comparator = InventoryComparator::new(
//!     Path::new("laptop.db"),
//!     Path::new("backup.db"),
//!     CompareConfig::default(),
//! );
//! let report = comparator.compare().unwrap();
//! for m in &report.matches {
//!     println!("{} {:?} {:?}", m.hash, m.first_examples, m.second_examples);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::{DuplicateFinder, DEFAULT_DUPLICATE_PAGE_SIZE};
use crate::progress::{Phase, ProgressCallback};
use crate::store::{InventoryStore, StoreError, StoreResult};

/// Default number of example paths sampled per side.
pub const DEFAULT_EXAMPLE_LIMIT: usize = 2;

/// Errors from a comparison, naming the inventory that failed.
#[derive(Debug, Error)]
pub enum CompareError {
    /// The first inventory could not be read.
    #[error("Cannot read first inventory {path}: {source}")]
    First {
        /// Database path
        path: PathBuf,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// The second inventory could not be read.
    #[error("Cannot read second inventory {path}: {source}")]
    Second {
        /// Database path
        path: PathBuf,
        /// Underlying store error
        #[source]
        source: StoreError,
    },
}

/// How store connections are held during a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionPolicy {
    /// Open a fresh read-only connection for every lookup.
    #[default]
    PerLookup,
    /// Hold one read-only connection per store for the whole run.
    Persistent,
}

/// Configuration for a comparison.
#[derive(Clone)]
pub struct CompareConfig {
    /// Example paths sampled per side.
    pub example_limit: usize,
    /// Groups fetched per page from the first inventory.
    pub page_size: usize,
    /// Connection lifecycle.
    pub policy: ConnectionPolicy,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for CompareConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompareConfig")
            .field("example_limit", &self.example_limit)
            .field("page_size", &self.page_size)
            .field("policy", &self.policy)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            example_limit: DEFAULT_EXAMPLE_LIMIT,
            page_size: DEFAULT_DUPLICATE_PAGE_SIZE,
            policy: ConnectionPolicy::PerLookup,
            progress_callback: None,
        }
    }
}

impl CompareConfig {
    /// Set the number of example paths per side.
    #[must_use]
    pub fn with_example_limit(mut self, limit: usize) -> Self {
        self.example_limit = limit;
        self
    }

    /// Set the page size for reading duplicate hashes.
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Set the connection policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// A hash duplicated in the first inventory and present in the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossMatch {
    /// Shared content hash
    pub hash: String,
    /// Stored paths from the first inventory
    pub first_examples: Vec<String>,
    /// Paths from the second inventory, made absolute
    pub second_examples: Vec<PathBuf>,
}

/// Result of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareReport {
    /// Duplicate hashes examined from the first inventory
    pub candidates: u64,
    /// Matches, in the first inventory's duplicate order
    pub matches: Vec<CrossMatch>,
}

impl CompareReport {
    /// Look up a match by hash.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&CrossMatch> {
        self.matches.iter().find(|m| m.hash == hash)
    }

    /// Number of matches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Check if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Opens one side on demand according to the connection policy.
struct Side<'p> {
    path: &'p Path,
    policy: ConnectionPolicy,
    held: Option<InventoryStore>,
}

impl<'p> Side<'p> {
    fn new(path: &'p Path, policy: ConnectionPolicy) -> Self {
        Self {
            path,
            policy,
            held: None,
        }
    }

    fn with<T>(&mut self, f: impl FnOnce(&InventoryStore) -> StoreResult<T>) -> StoreResult<T> {
        match self.policy {
            ConnectionPolicy::PerLookup => f(&InventoryStore::open_existing(self.path)?),
            ConnectionPolicy::Persistent => match &self.held {
                Some(store) => f(store),
                None => f(self.held.insert(InventoryStore::open_existing(self.path)?)),
            },
        }
    }
}

/// Compares two inventories.
#[derive(Debug)]
pub struct InventoryComparator {
    first: PathBuf,
    second: PathBuf,
    config: CompareConfig,
}

impl InventoryComparator {
    /// Create a comparator over two database files.
    #[must_use]
    pub fn new(first: &Path, second: &Path, config: CompareConfig) -> Self {
        Self {
            first: first.to_path_buf(),
            second: second.to_path_buf(),
            config,
        }
    }

    /// Run the comparison.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError`] naming the inventory that could not be
    /// opened or queried. A missing database is an error, never created.
    pub fn compare(&self) -> Result<CompareReport, CompareError> {
        let candidates = self.candidates()?;
        log::info!(
            "Checking {} duplicate hashes from {} against {}",
            candidates.len(),
            self.first.display(),
            self.second.display()
        );

        let callback = self.config.progress_callback.as_deref();
        if let Some(cb) = callback {
            cb.on_phase_start(Phase::Compare, candidates.len() as u64);
        }

        let mut second = Side::new(&self.second, self.config.policy);
        let mut matched = Vec::new();
        for (i, hash) in candidates.iter().enumerate() {
            let present = second
                .with(|store| store.has_hash(hash))
                .map_err(|e| self.second_err(e))?;
            if present {
                log::debug!("Match: {}", hash);
                matched.push(hash.as_str());
            }
            if let Some(cb) = callback {
                cb.on_progress(i as u64 + 1, hash);
            }
        }

        let mut first = Side::new(&self.first, self.config.policy);
        let limit = Some(self.config.example_limit);
        let mut report = CompareReport {
            candidates: candidates.len() as u64,
            matches: Vec::with_capacity(matched.len()),
        };
        for hash in matched {
            let first_examples = first
                .with(|store| store.select_by_hash(hash, limit))
                .map_err(|e| self.first_err(e))?
                .into_iter()
                .map(|r| r.file_path)
                .collect();
            let second_examples = second
                .with(|store| store.select_by_hash(hash, limit))
                .map_err(|e| self.second_err(e))?
                .iter()
                .map(|r| absolute(r.path()))
                .collect();
            report.matches.push(CrossMatch {
                hash: hash.to_string(),
                first_examples,
                second_examples,
            });
        }

        if let Some(cb) = callback {
            cb.on_phase_end(Phase::Compare);
        }
        log::info!(
            "{} of {} duplicate hashes also present in {}",
            report.len(),
            report.candidates,
            self.second.display()
        );
        Ok(report)
    }

    /// Duplicate hashes of the first inventory, read on a short-lived
    /// connection.
    fn candidates(&self) -> Result<Vec<String>, CompareError> {
        let store = InventoryStore::open_existing(&self.first).map_err(|e| self.first_err(e))?;
        DuplicateFinder::new(&store)
            .with_page_size(self.config.page_size)
            .duplicate_hashes()
            .collect::<StoreResult<Vec<_>>>()
            .map_err(|e| self.first_err(e))
    }

    fn first_err(&self, source: StoreError) -> CompareError {
        CompareError::First {
            path: self.first.clone(),
            source,
        }
    }

    fn second_err(&self, source: StoreError) -> CompareError {
        CompareError::Second {
            path: self.second.clone(),
            source,
        }
    }
}

/// Resolve `path` against the current directory; leaves it as stored if
/// that is impossible.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|e| {
        log::debug!("Cannot make {} absolute: {}", path.display(), e);
        path.to_path_buf()
    })
}
