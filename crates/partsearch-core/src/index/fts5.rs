//! The trigram text index over file names and paths.
//!
//! An external-content FTS5 table mirrors `files(name, path)` through
//! triggers. With the trigram tokenizer any quoted fragment of three or more
//! characters is a case-insensitive substring match.

use crate::config::StoreConfig;
use crate::Result;
use rusqlite::{params, Connection};
use tracing::{debug, info};

/// Schema handle for one store's text index.
#[derive(Debug, Clone)]
pub struct TextIndex {
    table: String,
    /// `trigram` gives substring semantics; word tokenizers do not.
    tokenizer: String,
}

impl Default for TextIndex {
    fn default() -> Self {
        Self {
            table: StoreConfig::FTS_TABLE_NAME.to_string(),
            tokenizer: "trigram".to_string(),
        }
    }
}

impl TextIndex {
    fn trigger_names(&self) -> [String; 3] {
        ["ai", "ad", "au"].map(|suffix| format!("{}_{}", self.table, suffix))
    }

    fn count_objects(&self, conn: &Connection, kind: &str, names: &[String]) -> Result<usize> {
        let mut stmt =
            conn.prepare_cached("SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2")?;
        let mut found = 0;
        for name in names {
            if stmt.exists(params![kind, name])? {
                found += 1;
            }
        }
        Ok(found)
    }

    pub fn table_exists(&self, conn: &Connection) -> Result<bool> {
        Ok(self.count_objects(conn, "table", &[self.table.clone()])? == 1)
    }

    /// All three sync triggers are installed.
    pub fn triggers_exist(&self, conn: &Connection) -> Result<bool> {
        Ok(self.count_objects(conn, "trigger", &self.trigger_names())? == 3)
    }

    /// Bring the table and triggers into place. A table that was missing, or
    /// that lost its triggers, is refilled from `files`.
    pub fn ensure_setup(&self, conn: &Connection) -> Result<()> {
        let had_table = self.table_exists(conn)?;
        let stale = !had_table || !self.triggers_exist(conn)?;

        if !had_table {
            self.create_table(conn)?;
        }
        if stale {
            self.rebuild_content(conn)?;
        }
        self.create_triggers(conn)
    }

    pub fn create_table(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {table} USING fts5(
                name, path,
                content = 'files', content_rowid = 'id',
                tokenize = '{tokenizer}'
            );",
            table = self.table,
            tokenizer = self.tokenizer,
        ))?;
        info!(table = %self.table, tokenizer = %self.tokenizer, "Created text index");
        Ok(())
    }

    /// Mirror inserts, deletes and `name`/`path` updates of `files`.
    ///
    /// A pass that only touches `pass_id` does not fire the update trigger.
    pub fn create_triggers(&self, conn: &Connection) -> Result<()> {
        let [ai, ad, au] = self.trigger_names();
        let t = &self.table;
        conn.execute_batch(&format!(
            "CREATE TRIGGER IF NOT EXISTS {ai} AFTER INSERT ON files BEGIN
                INSERT INTO {t}(rowid, name, path) VALUES (new.id, new.name, new.path);
            END;
            CREATE TRIGGER IF NOT EXISTS {ad} AFTER DELETE ON files BEGIN
                INSERT INTO {t}({t}, rowid, name, path) VALUES ('delete', old.id, old.name, old.path);
            END;
            CREATE TRIGGER IF NOT EXISTS {au} AFTER UPDATE OF name, path ON files BEGIN
                INSERT INTO {t}({t}, rowid, name, path) VALUES ('delete', old.id, old.name, old.path);
                INSERT INTO {t}(rowid, name, path) VALUES (new.id, new.name, new.path);
            END;"
        ))?;
        debug!(table = %t, "Text index triggers in place");
        Ok(())
    }

    fn command(&self, conn: &Connection, command: &str) -> Result<()> {
        let t = &self.table;
        conn.execute(&format!("INSERT INTO {t}({t}) VALUES (?1)"), [command])?;
        Ok(())
    }

    /// Regenerate the index from the content table.
    pub fn rebuild_content(&self, conn: &Connection) -> Result<()> {
        self.command(conn, "rebuild")?;
        debug!(table = %self.table, "Refilled text index");
        Ok(())
    }

    /// Drop everything and build it again. Used for stores whose older
    /// text index was not tokenized for substring search.
    pub fn recreate(&self, conn: &Connection) -> Result<()> {
        let drops: String = self
            .trigger_names()
            .iter()
            .map(|name| format!("DROP TRIGGER IF EXISTS {name};"))
            .chain(std::iter::once(format!("DROP TABLE IF EXISTS {};", self.table)))
            .collect();
        conn.execute_batch(&drops)?;

        self.create_table(conn)?;
        self.create_triggers(conn)?;
        self.rebuild_content(conn)?;
        info!(table = %self.table, "Recreated text index");
        Ok(())
    }

    /// Merge index segments.
    pub fn optimize(&self, conn: &Connection) -> Result<()> {
        self.command(conn, "optimize")
    }
}
