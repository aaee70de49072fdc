//! Record definitions for the inventory table.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One file's persisted metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned row id (insertion order)
    pub id: i64,
    /// Hex content digest, empty when not hashed or when hashing failed
    pub content_hash: String,
    /// Base name of the file
    pub file_name: String,
    /// Path used to re-open the file
    pub file_path: String,
    /// Size in bytes observed at traversal time
    pub file_size: u64,
    /// Whether a hash attempt has completed
    pub hashed: bool,
}

impl Record {
    /// The stored path as a [`Path`].
    #[must_use]
    pub fn path(&self) -> &Path {
        Path::new(&self.file_path)
    }

    /// Whether the last hash attempt failed permanently.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.hashed && self.content_hash.is_empty()
    }

    /// Cursor positioned on this record for keyset paging.
    #[must_use]
    pub fn cursor(&self) -> PageCursor {
        PageCursor {
            file_size: self.file_size,
            id: self.id,
        }
    }
}

/// Insert shape for a record produced by traversal.
///
/// The store assigns the id and starts every record unhashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Base name of the file
    pub file_name: String,
    /// Path used to re-open the file
    pub file_path: String,
    /// Size in bytes
    pub file_size: u64,
}

impl NewRecord {
    /// Build an insert record from a path and size.
    ///
    /// The name is the final path component, or the whole path when the
    /// path has none.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, file_size: u64) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            file_name,
            file_path: path.to_string_lossy().into_owned(),
            file_size,
        }
    }
}

/// Which records count as pending work for the hash pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingFilter {
    /// Records with `is_hashed = 0`.
    #[default]
    Unhashed,
    /// Records whose hash is empty, including failed ones.
    EmptyHash,
}

impl PendingFilter {
    pub(crate) fn where_clause(self) -> &'static str {
        match self {
            Self::Unhashed => "is_hashed = 0",
            Self::EmptyHash => "file_hash = ''",
        }
    }
}

/// Position in the `(file_size DESC, id ASC)` ordering of pending records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Size of the last record seen
    pub file_size: u64,
    /// Id of the last record seen
    pub id: i64,
}

/// A content hash shared by more than one non-empty record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCount {
    /// Content hash of the group
    pub hash: String,
    /// Number of records carrying the hash
    pub count: u64,
}

impl DuplicateCount {
    /// Cursor positioned on this group for keyset paging.
    #[must_use]
    pub fn cursor(&self) -> GroupCursor {
        GroupCursor {
            count: self.count,
            hash: self.hash.clone(),
        }
    }
}

/// Aggregate figures over every duplicate group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateTotals {
    /// Number of duplicate groups
    pub groups: u64,
    /// Records that belong to some group
    pub duplicate_files: u64,
    /// Bytes held by copies beyond the first in each group
    pub reclaimable_bytes: u64,
}

/// Position in the `(count DESC, hash ASC)` ordering of duplicate groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCursor {
    /// Count of the last group seen
    pub count: u64,
    /// Hash of the last group seen
    pub hash: String,
}
