//! Per-root SQLite index stores.
//!
//! This module provides:
//! - The `files` table of [`FileEntry`] rows keyed by `(root, path)`
//! - A trigram FTS5 table kept in sync by triggers
//! - Versioned schema migrations applied when a store is opened
//! - Read-only connections for searches running beside an indexing pass

mod entry;
mod fts5;
pub mod migrations;
mod store;

pub use entry::{epoch_seconds, FileEntry};
pub use fts5::TextIndex;
pub use store::{BatchOutcome, IndexStore, UpsertOutcome};
