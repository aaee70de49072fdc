//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Grouping hashed records by content hash (count > 1, size > 0)
//! - Streaming the duplicate hashes for cross-inventory comparison
//! - Loading group members for the duplicate report

pub mod finder;
pub mod groups;

pub use finder::{DuplicateFinder, DuplicateGroups, DuplicateHashes, DEFAULT_DUPLICATE_PAGE_SIZE};
pub use groups::DuplicateGroup;
