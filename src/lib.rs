//! Threaded Inventory - content-addressed file inventory
//!
//! Records every file under a directory tree in a SQLite inventory, hashes
//! contents with BLAKE3 through a bounded producer/consumer pipeline, and
//! reports duplicate content within one inventory or shared between two.
//!
//! The flow is leaf-first:
//!
//! 1. [`ingest`] walks a tree with [`scanner`] and appends [`store`] records
//!    in small transactions.
//! 2. [`pipeline`] drains unhashed records, largest first, and writes each
//!    digest back.
//! 3. [`duplicates`] groups hashed records; [`output`] writes the report.
//! 4. [`compare`] probes a second inventory for the first one's duplicates.

pub mod app;
pub mod cli;
pub mod compare;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod store;

pub use app::run_app;
