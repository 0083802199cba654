//! Versioned schema migrations for index stores.
//!
//! The schema version lives in `PRAGMA user_version`. Each step runs in its
//! own transaction when the store is opened for writing, and only the steps
//! above the stored version are applied.

use super::fts5::TextIndex;
use crate::Result;
use rusqlite::{Connection, Transaction};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Highest schema version this build knows about.
pub const CURRENT_VERSION: i32 = 2;

pub fn schema_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring a store up to [`CURRENT_VERSION`].
///
/// `root` is written into rows of legacy stores that predate the `root`
/// column. A failure creating the text index leaves the store at version 1;
/// the pattern-matching path still works and the step is retried on the
/// next open.
pub fn migrate(conn: &mut Connection, root: &str) -> Result<()> {
    let version = schema_version(conn)?;
    if version >= CURRENT_VERSION {
        return Ok(());
    }

    if version < 1 {
        let tx = conn.transaction()?;
        migrate_base_tables(&tx, root)?;
        set_version(&tx, 1)?;
        tx.commit()?;
        info!("Index store schema at version 1");
    }

    if version < 2 {
        let tx = conn.transaction()?;
        match migrate_text_index(&tx) {
            Ok(()) => {
                set_version(&tx, 2)?;
                tx.commit()?;
                info!("Index store schema at version 2");
            }
            Err(e) => {
                warn!("Text index unavailable, using pattern matching: {}", e);
            }
        }
    }

    Ok(())
}

fn set_version(tx: &Transaction<'_>, version: i32) -> Result<()> {
    tx.execute_batch(&format!("PRAGMA user_version = {};", version))?;
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut columns = HashSet::new();
    for row in rows {
        columns.insert(row?);
    }
    Ok(columns)
}

/// Version 1: base tables, plus the upgrade of stores written by older
/// releases.
fn migrate_base_tables(tx: &Transaction<'_>, root: &str) -> Result<()> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT
        );

        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY,
            root TEXT,
            path TEXT NOT NULL,
            name TEXT,
            ext TEXT,
            size INTEGER,
            mtime REAL,
            ctime REAL,
            is_dir INTEGER NOT NULL DEFAULT 0,
            parent TEXT,
            pass_id INTEGER
        );",
    )?;

    let meta_columns = table_columns(tx, "meta")?;
    if !meta_columns.contains("value") {
        tx.execute_batch("ALTER TABLE meta ADD COLUMN value TEXT;")?;
    }
    if meta_columns.contains("val") {
        tx.execute("UPDATE meta SET value = val WHERE value IS NULL", [])?;
        debug!("Copied legacy meta values");
    }

    let columns = table_columns(tx, "files")?;
    for (column, ddl) in [
        ("root", "TEXT"),
        ("parent", "TEXT"),
        ("ctime", "REAL"),
        ("pass_id", "INTEGER"),
    ] {
        if !columns.contains(column) {
            tx.execute_batch(&format!("ALTER TABLE files ADD COLUMN {} {};", column, ddl))?;
            debug!("Added files.{}", column);
        }
    }
    if !columns.contains("is_dir") {
        tx.execute_batch("ALTER TABLE files ADD COLUMN is_dir INTEGER NOT NULL DEFAULT 0;")?;
        if columns.contains("dir") {
            tx.execute("UPDATE files SET is_dir = COALESCE(dir, 0)", [])?;
            debug!("Mirrored legacy files.dir into is_dir");
        }
    }

    let adopted = tx.execute("UPDATE files SET root = ?1 WHERE root IS NULL", [root])?;
    if adopted > 0 {
        info!("Attributed {} legacy rows to {}", adopted, root);
    }

    tx.execute_batch(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_files_root_path ON files(root, path);
        CREATE INDEX IF NOT EXISTS ix_files_name ON files(name);
        CREATE INDEX IF NOT EXISTS ix_files_ext ON files(ext);
        CREATE INDEX IF NOT EXISTS ix_files_parent ON files(parent);
        CREATE INDEX IF NOT EXISTS ix_files_isdir ON files(is_dir);
        CREATE INDEX IF NOT EXISTS ix_files_pass ON files(pass_id);
        CREATE INDEX IF NOT EXISTS ix_files_mtime ON files(mtime);",
    )?;

    Ok(())
}

/// Version 2: trigram FTS5 table and its triggers. Any older text index is
/// replaced, since a word tokenizer cannot answer substring queries.
fn migrate_text_index(tx: &Transaction<'_>) -> Result<()> {
    TextIndex::default().recreate(tx)
}
