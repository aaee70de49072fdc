//! Materialized duplicate groups.
//!
//! The store answers grouping questions with `(hash, count)` pairs; a
//! [`DuplicateGroup`] adds the member records for reporting.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::store::{DuplicateCount, Record};

/// Records sharing one non-empty content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by every member
    pub hash: String,
    /// Member count reported by the grouping query
    pub count: u64,
    /// Member records, ordered by id
    pub members: Vec<Record>,
}

impl DuplicateGroup {
    /// Create a group from its grouping row and member records.
    #[must_use]
    pub fn new(group: DuplicateCount, members: Vec<Record>) -> Self {
        Self {
            hash: group.hash,
            count: group.count,
            members,
        }
    }

    /// Number of member records loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if no members were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Size of one copy, taken from the largest member.
    ///
    /// Members share content, so sizes only differ if a file changed
    /// between traversal and hashing.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.members.iter().map(|r| r.file_size).max().unwrap_or(0)
    }

    /// Bytes held by every copy beyond the first.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.file_size() * self.count.saturating_sub(1)
    }

    /// Member paths in id order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.members.iter().map(Record::path)
    }

    /// Path of the first member, shown on the report's summary row.
    #[must_use]
    pub fn first_path(&self) -> Option<&str> {
        self.members.first().map(|r| r.file_path.as_str())
    }
}
