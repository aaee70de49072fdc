//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a scan root and
//! collecting the metadata the inventory stores for each file. Traversal is
//! sequential and ordered, which keeps the exclude semantics simple: a
//! directory whose path equals an entry of the excludes list is skipped
//! together with its whole subtree.
//!
//! # Example
//!
//! ```no_run
//! use threaded_inventory::scanner::{Walker, WalkerConfig};
//! use std::path::{Path, PathBuf};
//!
//! let config = WalkerConfig::with_excludes(vec![PathBuf::from("/srv/data/tmp")]);
//! let walker = Walker::new(Path::new("/srv/data"), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Bad path: {}", e.path().display()),
//!     }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root directory of the walk.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir() && self.config.excludes.iter().any(|x| x == entry.path())
    }

    fn entries(&self) -> impl Iterator<Item = walkdir::Result<DirEntry>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .into_iter()
            .filter_entry(move |entry| {
                if self.is_excluded(entry) {
                    log::debug!("Skipping excluded directory: {}", entry.path().display());
                    false
                } else {
                    true
                }
            })
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
    }

    /// Walk the tree, yielding one item per non-directory entry.
    ///
    /// Entries whose metadata cannot be read, and directories that cannot
    /// be listed, are yielded as [`ScanError`]s carrying the path.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        self.entries().filter_map(move |item| match item {
            Ok(entry) => self.process_entry(&entry),
            Err(err) => Some(Err(self.handle_walkdir_error(err))),
        })
    }

    /// Count the non-directory entries the walk would visit.
    ///
    /// Used to size the ingestion progress bar; no metadata is read.
    #[must_use]
    pub fn count_files(&self) -> u64 {
        self.entries()
            .filter_map(Result::ok)
            .filter(|entry| !entry.file_type().is_dir())
            .count() as u64
    }

    fn process_entry(&self, entry: &DirEntry) -> Option<Result<FileEntry, ScanError>> {
        if entry.file_type().is_dir() {
            return None;
        }

        let path = entry.path();
        if path.to_str().is_none() {
            log::warn!("Path is not valid UTF-8: {}", path.display());
            return Some(Err(ScanError::InvalidPath(path.to_path_buf())));
        }

        // Follows symlinks, so a dangling link is reported as a bad path.
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => return Some(Err(self.handle_io_error(path, e))),
        };
        if metadata.is_dir() {
            log::trace!("Not descending into linked directory: {}", path.display());
            return None;
        }

        log::trace!("Found {} ({} bytes)", path.display(), metadata.len());
        Some(Ok(FileEntry::new(
            path.to_path_buf(),
            entry.file_name().to_string_lossy().into_owned(),
            metadata.len(),
        )))
    }

    fn handle_io_error(&self, path: &Path, error: io::Error) -> ScanError {
        match error.kind() {
            io::ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
            }
            _ => log::warn!("Cannot read {}: {}", path.display(), error),
        }
        ScanError::from_io(path.to_path_buf(), error)
    }

    fn handle_walkdir_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        log::warn!("Walker error for {}: {}", path.display(), error);
        let message = error.to_string();
        let source = error
            .into_io_error()
            .unwrap_or_else(|| io::Error::other(message));
        ScanError::from_io(path, source)
    }
}
