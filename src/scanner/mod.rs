//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Sequential directory walking using walkdir, with exact-match pruning
//!   of excluded directories
//! - Content hashing with BLAKE3
//! - Loading the operator's excludes file
//! - Platform path styles for re-opening stored paths
//!
//! # Architecture
//!
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//! - [`excludes`]: Excludes-file loading
//! - [`path_utils`]: Path styles (long-path prefixing on Windows)
//!
//! # Example
//!
//! ```no_run
//! use threaded_inventory::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod excludes;
pub mod hasher;
pub mod path_utils;
pub mod walker;

use std::path::PathBuf;

pub use excludes::{load_excludes, ExcludesError};
pub use hasher::{hash_bytes, is_digest, HashOutput, Hasher, DIGEST_HEX_LEN};
pub use path_utils::PathStyle;
pub use walker::Walker;

use crate::store::NewRecord;

/// Metadata for a discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path as produced by traversal (scan root joined with the relative path)
    pub path: PathBuf,
    /// Base name of the file
    pub name: String,
    /// File size in bytes
    pub size: u64,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, name: String, size: u64) -> Self {
        Self { path, name, size }
    }
}

impl From<FileEntry> for NewRecord {
    fn from(entry: FileEntry) -> Self {
        Self {
            file_name: entry.name,
            file_path: entry.path.to_string_lossy().into_owned(),
            file_size: entry.size,
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Directories pruned from traversal, together with their subtrees.
    /// A directory is pruned only when its path equals an entry exactly.
    pub excludes: Vec<PathBuf>,
}

impl WalkerConfig {
    /// Create a configuration that prunes the given directories.
    #[must_use]
    pub fn with_excludes(excludes: Vec<PathBuf>) -> Self {
        Self {
            excludes,
            ..Default::default()
        }
    }
}

/// Errors that can occur during directory scanning.
///
/// Every variant carries the offending path so ingestion can record it as
/// a bad path.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path vanished between listing and reading its metadata.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The path cannot be stored faithfully as text.
    #[error("Path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Build a scan error from an I/O error on `path`.
    #[must_use]
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }

    /// The path that could not be read.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::InvalidPath(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Build a hash error from an I/O error on `path`.
    #[must_use]
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }
}
