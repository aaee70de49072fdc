//! Persistent record store for the file inventory.
//!
//! This module owns the single SQLite table that backs an inventory. Every
//! file observed during traversal becomes one [`Record`]; the hash pipeline
//! later fills in its content hash, and the duplicate finder and comparator
//! read it back.
//!
//! # Architecture
//!
//! * [`database`]: connection handling, schema management and every query
//!   shape the inventory needs.
//! * [`record`]: the record model, the insert shape and paging cursors.
//!
//! # Indexes
//!
//! The table is indexed on:
//! * `file_hash` (duplicate grouping, existence checks, sampling)
//! * `file_name`
//! * `(is_hashed, file_size)` (largest-first selection of pending work)

pub mod database;
pub mod record;

pub use database::{InventoryStore, StoreError, StoreResult, DEFAULT_MAX_INSERT_BATCH};
pub use record::{
    DuplicateCount, DuplicateTotals, GroupCursor, NewRecord, PageCursor, PendingFilter, Record,
};
