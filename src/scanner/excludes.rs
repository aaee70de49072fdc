//! Excludes-file loading.
//!
//! The excludes file lists one directory path per line. Surrounding
//! whitespace is trimmed and blank lines are ignored. The file is read
//! before any scanning begins, so a problem here aborts the run.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while loading an excludes file.
#[derive(Debug, Error)]
pub enum ExcludesError {
    /// The file could not be read.
    #[error("Failed to read excludes file {path}: {source}")]
    Read {
        /// Excludes file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A line could not be decoded or contains a NUL byte.
    #[error("Malformed excludes file {path}: line {line} is not a valid path")]
    Malformed {
        /// Excludes file path
        path: PathBuf,
        /// 1-based line number
        line: usize,
    },
}

/// Load the directory excludes listed in `path`.
///
/// # Errors
///
/// Returns [`ExcludesError::Read`] if the file cannot be read and
/// [`ExcludesError::Malformed`] if a line is not valid UTF-8 or contains a
/// NUL byte.
pub fn load_excludes(path: &Path) -> Result<Vec<PathBuf>, ExcludesError> {
    let bytes = fs::read(path).map_err(|source| ExcludesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let excludes = parse_excludes(&bytes).map_err(|line| ExcludesError::Malformed {
        path: path.to_path_buf(),
        line,
    })?;
    log::debug!(
        "Loaded {} excluded directories from {}",
        excludes.len(),
        path.display()
    );
    Ok(excludes)
}

/// Parse excludes content; the error is the 1-based offending line.
fn parse_excludes(bytes: &[u8]) -> Result<Vec<PathBuf>, usize> {
    let mut excludes = Vec::new();
    for (idx, raw) in bytes.split(|&b| b == b'\n').enumerate() {
        let line = std::str::from_utf8(raw).map_err(|_| idx + 1)?;
        if line.contains('\0') {
            return Err(idx + 1);
        }
        let line = line.trim();
        if !line.is_empty() {
            excludes.push(PathBuf::from(line));
        }
    }
    Ok(excludes)
}
