//! Duplicate finder over a hashed inventory.
//!
//! # Overview
//!
//! Grouping is a single `GROUP BY file_hash HAVING COUNT(*) > 1` aggregate
//! over the hash index, restricted to non-empty files with a non-empty hash.
//! Nothing is compared pairwise and the store is never modified.
//!
//! [`DuplicateFinder::duplicate_hashes`] pages through the same grouping with
//! a `(count, hash)` keyset cursor, so inventories with millions of groups
//! are streamed rather than loaded.
//!
//! # Example
//!
//! ```no_run
//! use threaded_inventory::duplicates::DuplicateFinder;
//! use threaded_inventory::store::InventoryStore;
//! use std::path::Path;
//!
//! let store = InventoryStore::open(Path::new("inventory.db")).unwrap();
//! let finder = DuplicateFinder::new(&store);
//! for hash in finder.duplicate_hashes() {
//!     println!("{}", hash.unwrap());
//! }
//! ```

use std::collections::VecDeque;

use crate::store::{
    DuplicateCount, DuplicateTotals, GroupCursor, InventoryStore, Record, StoreResult,
};

use super::DuplicateGroup;

/// Default number of groups fetched per page.
pub const DEFAULT_DUPLICATE_PAGE_SIZE: usize = 1000;

/// Read-only duplicate queries over one store.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateFinder<'a> {
    store: &'a InventoryStore,
    page_size: usize,
}

impl<'a> DuplicateFinder<'a> {
    /// Create a finder over `store`.
    #[must_use]
    pub fn new(store: &'a InventoryStore) -> Self {
        Self {
            store,
            page_size: DEFAULT_DUPLICATE_PAGE_SIZE,
        }
    }

    /// Set the number of groups fetched per page.
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Every duplicate group as `(hash, count)`, largest group first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn groups(&self) -> StoreResult<Vec<DuplicateCount>> {
        self.store.group_duplicates()
    }

    /// Lazily page through duplicate groups in [`groups`](Self::groups) order.
    #[must_use]
    pub fn pages(&self) -> DuplicateGroups<'a> {
        DuplicateGroups {
            store: self.store,
            page_size: self.page_size,
            cursor: None,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Lazily yield the hash of every duplicate group.
    ///
    /// Each call starts from the first group.
    #[must_use]
    pub fn duplicate_hashes(&self) -> DuplicateHashes<'a> {
        DuplicateHashes {
            inner: self.pages(),
        }
    }

    /// Non-empty records carrying `hash`, in id order.
    ///
    /// Zero-size records are not group members even when they share the
    /// hash, so the result always agrees with the group's count.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn members(&self, hash: &str) -> StoreResult<Vec<Record>> {
        self.store.select_group_members(hash)
    }

    /// Load the members of one group.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn expand(&self, group: DuplicateCount) -> StoreResult<DuplicateGroup> {
        let members = self.members(&group.hash)?;
        Ok(DuplicateGroup::new(group, members))
    }

    /// Totals over every group.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn summary(&self) -> StoreResult<DuplicateTotals> {
        self.store.duplicate_totals()
    }
}

/// Paging iterator over duplicate groups.
#[derive(Debug)]
pub struct DuplicateGroups<'a> {
    store: &'a InventoryStore,
    page_size: usize,
    cursor: Option<GroupCursor>,
    buffer: VecDeque<DuplicateCount>,
    done: bool,
}

impl Iterator for DuplicateGroups<'_> {
    type Item = StoreResult<DuplicateCount>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            match self
                .store
                .duplicate_page(self.cursor.as_ref(), Some(self.page_size))
            {
                Ok(page) => {
                    self.done = page.len() < self.page_size;
                    self.cursor = page.last().map(DuplicateCount::cursor);
                    log::trace!("Fetched {} duplicate groups", page.len());
                    self.buffer.extend(page);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Paging iterator over duplicate hashes.
#[derive(Debug)]
pub struct DuplicateHashes<'a> {
    inner: DuplicateGroups<'a>,
}

impl Iterator for DuplicateHashes<'_> {
    type Item = StoreResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|group| group.map(|g| g.hash))
    }
}
