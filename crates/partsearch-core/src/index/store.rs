//! Per-root SQLite index store.

use super::entry::FileEntry;
use super::fts5::TextIndex;
use super::migrations;
use crate::config::StoreConfig;
use crate::metadata::parse_timestamp;
use crate::query::{ParsedQuery, CASEFOLD_FUNCTION};
use crate::{PartSearchError, Result};
use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{
    params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior,
};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// What an upsert did to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Identical data; only the scan generation was refreshed.
    Unchanged,
}

/// Tally of a committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
}

impl BatchOutcome {
    /// Rows whose stored content changed.
    pub fn changed(&self) -> u64 {
        self.inserted + self.updated
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

const SELECT_COLUMNS: &str =
    "root, path, name, ext, size, mtime, ctime, is_dir, parent, pass_id";

/// Durable table of [`FileEntry`] rows for one root.
///
/// Writers run in WAL mode so read-only connections opened by searches are
/// never blocked by an indexing pass.
pub struct IndexStore {
    db_path: PathBuf,
    root: String,
    conn: Mutex<Connection>,
    read_only: bool,
    text_index: TextIndex,
}

impl IndexStore {
    /// Open or create the store for `root`, applying pending migrations.
    pub fn open(db_path: impl Into<PathBuf>, root: &str) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| PartSearchError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let mut conn = Connection::open(&db_path)?;
        Self::configure_connection(&conn)?;
        migrations::migrate(&mut conn, root)?;

        debug!("Opened index store {}", db_path.display());
        Ok(Self {
            db_path,
            root: root.to_string(),
            conn: Mutex::new(conn),
            read_only: false,
            text_index: TextIndex::default(),
        })
    }

    /// Open an existing store for searching. The connection cannot write.
    pub fn open_read_only(db_path: impl Into<PathBuf>, root: &str) -> Result<Self> {
        let db_path = db_path.into();
        if !db_path.is_file() {
            return Err(PartSearchError::RootNotFound(db_path));
        }

        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(&format!(
            "PRAGMA query_only = ON;\n\
             PRAGMA busy_timeout = {};",
            StoreConfig::BUSY_TIMEOUT_MS
        ))?;
        Self::register_functions(&conn)?;

        Ok(Self {
            db_path,
            root: root.to_string(),
            conn: Mutex::new(conn),
            read_only: true,
            text_index: TextIndex::default(),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\n\
             PRAGMA busy_timeout = {};\n\
             PRAGMA synchronous = NORMAL;\n\
             PRAGMA temp_store = MEMORY;",
            StoreConfig::BUSY_TIMEOUT_MS
        ))?;
        Self::register_functions(conn)
    }

    /// Name matching folds case with Rust's Unicode rules, the same rules the
    /// live crawl applies, so `GEHÄUSE` and `gehäuse` are one name everywhere.
    fn register_functions(conn: &Connection) -> Result<()> {
        conn.create_scalar_function(
            CASEFOLD_FUNCTION,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| PartSearchError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Insert or update one entry, stamping it with `generation`.
    pub fn upsert(&self, entry: &FileEntry, generation: i64) -> Result<UpsertOutcome> {
        let conn = self.lock_conn()?;
        Self::upsert_on(&conn, entry, generation)
    }

    /// Upsert a batch in one transaction.
    ///
    /// Lock contention that outlives the busy timeout is retried a few times
    /// before `StoreBusy` is returned.
    pub fn upsert_batch(&self, entries: &[FileEntry], generation: i64) -> Result<BatchOutcome> {
        let mut conn = self.lock_conn()?;
        let mut attempt = 1;
        loop {
            match Self::try_upsert_batch(&mut conn, entries, generation) {
                Err(e) if e.is_retryable() && attempt < StoreConfig::BUSY_RETRY_ATTEMPTS => {
                    warn!(
                        "Index store busy (attempt {}/{}): {}",
                        attempt,
                        StoreConfig::BUSY_RETRY_ATTEMPTS,
                        e
                    );
                    std::thread::sleep(StoreConfig::BUSY_RETRY_DELAY);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn try_upsert_batch(
        conn: &mut Connection,
        entries: &[FileEntry],
        generation: i64,
    ) -> Result<BatchOutcome> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut outcome = BatchOutcome::default();
        for entry in entries {
            outcome.record(Self::upsert_on(&tx, entry, generation)?);
        }
        tx.commit()?;
        Ok(outcome)
    }

    /// Touch the row if nothing changed, else insert, else update.
    fn upsert_on(conn: &Connection, entry: &FileEntry, generation: i64) -> Result<UpsertOutcome> {
        let size = entry.size.map(|s| i64::try_from(s).unwrap_or(i64::MAX));

        let touched = conn
            .prepare_cached(
                "UPDATE files SET pass_id = ?3
                 WHERE root = ?1 AND path = ?2
                   AND name IS ?4 AND ext IS ?5 AND size IS ?6
                   AND mtime IS ?7 AND ctime IS ?8 AND is_dir = ?9 AND parent IS ?10",
            )?
            .execute(params![
                entry.root,
                entry.path,
                generation,
                entry.name,
                entry.ext,
                size,
                entry.modified,
                entry.created,
                entry.is_dir,
                entry.parent,
            ])?;
        if touched > 0 {
            return Ok(UpsertOutcome::Unchanged);
        }

        let inserted = conn
            .prepare_cached(
                "INSERT INTO files (root, path, name, ext, size, mtime, ctime, is_dir, parent, pass_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(root, path) DO NOTHING",
            )?
            .execute(params![
                entry.root,
                entry.path,
                entry.name,
                entry.ext,
                size,
                entry.modified,
                entry.created,
                entry.is_dir,
                entry.parent,
                generation,
            ])?;
        if inserted > 0 {
            return Ok(UpsertOutcome::Inserted);
        }

        conn.prepare_cached(
            "UPDATE files SET
                 name = ?3, ext = ?4, size = ?5, mtime = ?6, ctime = ?7,
                 is_dir = ?8, parent = ?9, pass_id = ?10
             WHERE root = ?1 AND path = ?2",
        )?
        .execute(params![
            entry.root,
            entry.path,
            entry.name,
            entry.ext,
            size,
            entry.modified,
            entry.created,
            entry.is_dir,
            entry.parent,
            generation,
        ])?;
        Ok(UpsertOutcome::Updated)
    }

    /// Delete this root's rows not seen by pass `generation`.
    ///
    /// Only call after that pass finished without cancellation.
    pub fn prune_older_than(&self, generation: i64) -> Result<usize> {
        let conn = self.lock_conn()?;
        let pruned = conn.execute(
            "DELETE FROM files WHERE root = ?1 AND (pass_id IS NULL OR pass_id < ?2)",
            params![self.root, generation],
        )?;
        debug!(root = %self.root, pruned, "Pruned stale entries");
        Ok(pruned)
    }

    /// Mint a scan generation greater than any this store has handed out.
    pub fn next_generation(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        let last = Self::meta_get(&conn, StoreConfig::META_LAST_GENERATION)?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let now = Utc::now().timestamp_millis();
        let generation = now.max(last + 1);
        Self::meta_set(&conn, StoreConfig::META_LAST_GENERATION, &generation.to_string())?;
        Ok(generation)
    }

    /// Whether the FTS5 table is present.
    pub fn has_text_index(&self) -> Result<bool> {
        let conn = self.lock_conn()?;
        self.text_index.table_exists(&conn)
    }

    /// Regenerate the FTS5 table from the current rows, creating it first
    /// if an earlier open could not.
    pub fn rebuild_text_index(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        let index = &self.text_index;
        if index.table_exists(&conn)? {
            index.rebuild_content(&conn)?;
            index.optimize(&conn)?;
        } else {
            index.ensure_setup(&conn)?;
        }
        debug!(root = %self.root, "Rebuilt text index");
        Ok(())
    }

    /// Number of rows for this root.
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE root = ?1",
            [&self.root],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    pub fn last_scan_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock_conn()?;
        Ok(Self::meta_get(&conn, StoreConfig::META_LAST_FULL_SCAN)?
            .as_deref()
            .and_then(parse_timestamp))
    }

    pub fn set_last_scan_timestamp(&self, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock_conn()?;
        Self::meta_set(&conn, StoreConfig::META_LAST_FULL_SCAN, &at.to_rfc3339())
    }

    /// Every distinct root identity present in this store.
    pub fn distinct_roots(&self) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT root FROM files WHERE root IS NOT NULL ORDER BY root")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut roots = Vec::new();
        for row in rows {
            roots.push(row?);
        }
        Ok(roots)
    }

    /// Entries whose name or path match every token, most recently modified
    /// first. `roots` restricts rows to those root identities.
    pub fn query_by_name_pattern(
        &self,
        query: &ParsedQuery,
        roots: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<FileEntry>> {
        let conn = self.lock_conn()?;
        Self::run_query(&conn, None, query, roots, limit)
    }

    /// Same contract as [`Self::query_by_name_pattern`], prefiltered through
    /// the FTS5 table.
    ///
    /// Returns `None` when the store has no text index or the query has no
    /// form the text index can answer; callers then use the pattern path.
    pub fn query_by_text_index(
        &self,
        query: &ParsedQuery,
        roots: Option<&[String]>,
        limit: usize,
    ) -> Result<Option<Vec<FileEntry>>> {
        let Some(fts_query) = query.to_fts5() else {
            return Ok(None);
        };
        let conn = self.lock_conn()?;
        if !self.text_index.table_exists(&conn)? {
            return Ok(None);
        }
        Self::run_query(&conn, Some(&fts_query), query, roots, limit).map(Some)
    }

    /// Text index when it can answer, pattern matching otherwise.
    pub fn search(
        &self,
        query: &ParsedQuery,
        roots: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<FileEntry>> {
        match self.query_by_text_index(query, roots, limit) {
            Ok(Some(entries)) => return Ok(entries),
            Ok(None) => {}
            Err(e) => warn!(
                "Text index query failed on {}, falling back: {}",
                self.db_path.display(),
                e
            ),
        }
        self.query_by_name_pattern(query, roots, limit)
    }

    fn run_query(
        conn: &Connection,
        fts_query: Option<&str>,
        query: &ParsedQuery,
        roots: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<FileEntry>> {
        let like = query.to_like();
        let mut where_parts = Vec::new();
        let mut params_vec: Vec<String> = Vec::new();

        if let Some(fts_query) = fts_query {
            where_parts.push(format!(
                "id IN (SELECT rowid FROM {table} WHERE {table} MATCH ?)",
                table = StoreConfig::FTS_TABLE_NAME
            ));
            params_vec.push(fts_query.to_string());
        }
        if let Some(roots) = roots {
            if roots.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders: Vec<_> = roots.iter().map(|_| "?").collect();
            where_parts.push(format!("root IN ({})", placeholders.join(",")));
            params_vec.extend(roots.iter().cloned());
        }
        where_parts.push(like.clause);
        params_vec.extend(like.params);

        let sql = format!(
            "SELECT {} FROM files WHERE {} ORDER BY mtime DESC LIMIT {}",
            SELECT_COLUMNS,
            where_parts.join(" AND "),
            i64::try_from(limit).unwrap_or(i64::MAX)
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params_vec.iter()), Self::row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            match row {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Error reading index row: {}", e),
            }
        }
        Ok(entries)
    }

    fn row_to_entry(row: &Row) -> rusqlite::Result<FileEntry> {
        let size: Option<i64> = row.get(4)?;
        Ok(FileEntry {
            root: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
            path: row.get(1)?,
            name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            ext: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            size: size.and_then(|s| u64::try_from(s).ok()),
            modified: row.get(5)?,
            created: row.get(6)?,
            is_dir: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
            parent: row.get(8)?,
            scan_generation: row.get(9)?,
        })
    }

    fn meta_get(conn: &Connection, key: &str) -> Result<Option<String>> {
        Ok(conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?
            .flatten())
    }

    fn meta_set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Checkpoint the WAL file.
    pub fn checkpoint_wal(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        debug!("Checkpointed WAL for {}", self.db_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ROOT: &str = "/srv/cad";

    fn create_test_store() -> (IndexStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::open(temp_dir.path().join("index_db.sqlite"), ROOT).unwrap();
        (store, temp_dir)
    }

    fn entry(name: &str, modified: f64) -> FileEntry {
        FileEntry {
            root: ROOT.to_string(),
            path: format!("{}/{}", ROOT, name),
            name: name.to_string(),
            ext: name.rsplit_once('.').map(|(_, e)| e.to_lowercase()).unwrap_or_default(),
            size: Some(100),
            modified: Some(modified),
            created: None,
            is_dir: false,
            parent: Some(ROOT.to_string()),
            scan_generation: None,
        }
    }

    fn names(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_upsert_outcomes() {
        let (store, _temp) = create_test_store();
        let mut e = entry("bracket.sldprt", 10.0);

        assert_eq!(store.upsert(&e, 1).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(&e, 2).unwrap(), UpsertOutcome::Unchanged);
        e.size = Some(200);
        assert_eq!(store.upsert(&e, 3).unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_batch_counts_only_real_changes() {
        let (store, _temp) = create_test_store();
        let batch: Vec<_> = (0..5).map(|i| entry(&format!("p{}.pdf", i), i as f64)).collect();

        let first = store.upsert_batch(&batch, 1).unwrap();
        assert_eq!(first.inserted, 5);
        let second = store.upsert_batch(&batch, 2).unwrap();
        assert_eq!(second.changed(), 0);
        assert_eq!(second.unchanged, 5);
    }

    #[test]
    fn test_prune_older_than() {
        let (store, _temp) = create_test_store();
        store.upsert(&entry("keep.pdf", 1.0), 1).unwrap();
        store.upsert(&entry("gone.pdf", 1.0), 1).unwrap();
        store.upsert(&entry("keep.pdf", 1.0), 2).unwrap();

        assert_eq!(store.prune_older_than(2).unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_next_generation_is_monotonic() {
        let (store, _temp) = create_test_store();
        let a = store.next_generation().unwrap();
        let b = store.next_generation().unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_last_scan_timestamp_roundtrip() {
        let (store, _temp) = create_test_store();
        assert!(store.last_scan_timestamp().unwrap().is_none());

        let at = DateTime::parse_from_rfc3339("2026-02-03T04:05:06Z")
            .unwrap()
            .with_timezone(&Utc);
        store.set_last_scan_timestamp(at).unwrap();
        assert_eq!(store.last_scan_timestamp().unwrap(), Some(at));
    }

    #[test]
    fn test_text_index_and_pattern_paths_agree() {
        let (store, _temp) = create_test_store();
        store.upsert(&entry("motorhousing.sldprt", 3.0), 1).unwrap();
        store.upsert(&entry("housingmotor.pdf", 2.0), 1).unwrap();
        store.upsert(&entry("Motor Housing rev2.pdf", 1.0), 1).unwrap();

        for raw in ["motor*", "motor housing", "\"motor housing\"", "HOUSING"] {
            let query = ParsedQuery::parse(raw, false);
            let by_text = store.query_by_text_index(&query, None, 10).unwrap().unwrap();
            let by_pattern = store.query_by_name_pattern(&query, None, 10).unwrap();
            assert_eq!(names(&by_text), names(&by_pattern), "query {}", raw);
        }

        let query = ParsedQuery::parse("motor*", false);
        assert_eq!(
            names(&store.search(&query, None, 10).unwrap()),
            vec!["motorhousing.sldprt", "Motor Housing rev2.pdf"]
        );

        let phrase = ParsedQuery::parse("\"motor housing\"", false);
        assert_eq!(
            names(&store.search(&phrase, None, 10).unwrap()),
            vec!["Motor Housing rev2.pdf"]
        );
    }

    #[test]
    fn test_short_query_has_no_text_form() {
        let (store, _temp) = create_test_store();
        store.upsert(&entry("a1.pdf", 1.0), 1).unwrap();
        let query = ParsedQuery::parse("a1", false);
        assert!(store.query_by_text_index(&query, None, 10).unwrap().is_none());
        assert_eq!(store.search(&query, None, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_query_orders_by_recency_and_caps() {
        let (store, _temp) = create_test_store();
        for i in 0..20 {
            store.upsert(&entry(&format!("f{:02}.pdf", i), i as f64), 1).unwrap();
        }
        let hits = store.search(&ParsedQuery::parse("", false), None, 5).unwrap();
        assert_eq!(names(&hits), vec!["f19.pdf", "f18.pdf", "f17.pdf", "f16.pdf", "f15.pdf"]);
    }

    #[test]
    fn test_root_filter_and_distinct_roots() {
        let (store, _temp) = create_test_store();
        store.upsert(&entry("a.pdf", 1.0), 1).unwrap();
        let mut other = entry("b.pdf", 2.0);
        other.root = "/srv/other".to_string();
        other.path = "/srv/other/b.pdf".to_string();
        store.upsert(&other, 1).unwrap();

        assert_eq!(store.distinct_roots().unwrap(), vec!["/srv/cad", "/srv/other"]);
        let only_other = vec!["/srv/other".to_string()];
        let hits = store
            .query_by_name_pattern(&ParsedQuery::parse("", false), Some(&only_other), 10)
            .unwrap();
        assert_eq!(names(&hits), vec!["b.pdf"]);
    }

    #[test]
    fn test_read_only_store_reads_but_cannot_write() {
        let (store, temp) = create_test_store();
        store.upsert(&entry("bolt.step", 1.0), 1).unwrap();
        drop(store);

        let reader =
            IndexStore::open_read_only(temp.path().join("index_db.sqlite"), ROOT).unwrap();
        assert!(reader.is_read_only());
        assert_eq!(reader.count().unwrap(), 1);
        assert!(reader.upsert(&entry("nut.step", 1.0), 2).is_err());
    }

    #[test]
    fn test_non_ascii_names_fold_like_the_matcher() {
        let (store, _temp) = create_test_store();
        store.upsert(&entry("GEHÄUSE.pdf", 2.0), 1).unwrap();
        store.upsert(&entry("Öffner.step", 1.0), 1).unwrap();

        for raw in ["gehäuse", "Gehäuse*", "\"gehäuse.pdf\"", "ÖFFNER"] {
            let query = ParsedQuery::parse(raw, false);
            let by_pattern = store.query_by_name_pattern(&query, None, 10).unwrap();
            assert_eq!(by_pattern.len(), 1, "query {}", raw);
            let hit = &by_pattern[0];
            assert!(query.matcher().unwrap().matches(&hit.name, &hit.path));
            assert_eq!(names(&store.search(&query, None, 10).unwrap()), names(&by_pattern));
        }

        let query = ParsedQuery::parse("gehäuse", false);
        let by_text = store.query_by_text_index(&query, None, 10).unwrap().unwrap();
        assert_eq!(names(&by_text), vec!["GEHÄUSE.pdf"]);
    }

    #[test]
    fn test_reader_is_not_blocked_by_open_write() {
        let (store, temp) = create_test_store();
        store.upsert(&entry("bolt.step", 1.0), 1).unwrap();
        let db_path = temp.path().join("index_db.sqlite");

        let other_writer = Connection::open(&db_path).unwrap();
        other_writer
            .execute_batch(
                "BEGIN IMMEDIATE;
                 INSERT INTO files (root, path, name, is_dir) VALUES ('/srv/cad', '/srv/cad/nut.step', 'nut.step', 0);",
            )
            .unwrap();

        let started = std::time::Instant::now();
        let reader = IndexStore::open_read_only(&db_path, ROOT).unwrap();
        assert_eq!(reader.count().unwrap(), 1);
        let hits = reader.search(&ParsedQuery::parse("bolt", false), None, 10).unwrap();
        assert_eq!(names(&hits), vec!["bolt.step"]);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));

        other_writer.execute_batch("COMMIT;").unwrap();
        assert_eq!(reader.count().unwrap(), 2);
    }

    #[test]
    fn test_batch_waits_out_transient_write_lock() {
        let (store, temp) = create_test_store();
        let other_writer = Connection::open(temp.path().join("index_db.sqlite")).unwrap();
        other_writer.execute_batch("BEGIN IMMEDIATE;").unwrap();
        let release = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(300));
            other_writer.execute_batch("COMMIT;").unwrap();
        });

        let batch = vec![entry("washer.step", 1.0), entry("shim.step", 2.0)];
        let outcome = store.upsert_batch(&batch, 1).unwrap();
        release.join().unwrap();

        assert_eq!(outcome.inserted, 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_read_only_missing_store() {
        let temp = TempDir::new().unwrap();
        let result = IndexStore::open_read_only(temp.path().join("missing.sqlite"), ROOT);
        assert!(matches!(result, Err(PartSearchError::RootNotFound(_))));
    }

    #[test]
    fn test_rebuild_text_index() {
        let (store, _temp) = create_test_store();
        store.upsert(&entry("flange.pdf", 1.0), 1).unwrap();
        store.rebuild_text_index().unwrap();
        assert!(store.has_text_index().unwrap());
        let query = ParsedQuery::parse("flange", false);
        assert_eq!(store.query_by_text_index(&query, None, 10).unwrap().unwrap().len(), 1);
    }
}
