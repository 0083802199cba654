//! Centralized configuration for PartSearch.
//!
//! Tunables for the index store, the indexer and the search fan-in are
//! grouped here as associated constants. Runtime choices (data directory,
//! host search backend) go through [`crate::PartSearchBuilder`].

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "PartSearch";
    pub const REGISTRY_FILE_NAME: &'static str = "index_roots.json";
    pub const REGISTRY_VERSION: u32 = 1;
}

/// Shared directory and file names under the data directory.
pub struct PathsConfig;

impl PathsConfig {
    pub const INDEX_DIR_NAME: &'static str = "index";
    pub const STORE_FILE_NAME: &'static str = "index_db.sqlite";
    /// Hex characters of the root key digest used as the store directory name.
    pub const STORE_DIR_HASH_LEN: usize = 12;
}

/// Index store connection and schema settings.
pub struct StoreConfig;

impl StoreConfig {
    /// How long SQLite waits on a locked database before reporting busy.
    pub const BUSY_TIMEOUT_MS: u64 = 10_000;
    /// Attempts for a batch commit that keeps hitting `StoreBusy`.
    pub const BUSY_RETRY_ATTEMPTS: u32 = 3;
    pub const BUSY_RETRY_DELAY: Duration = Duration::from_millis(250);
    pub const FTS_TABLE_NAME: &'static str = "files_fts";
    /// Trigram queries need at least this many characters per fragment.
    pub const FTS_MIN_FRAGMENT_CHARS: usize = 3;
    pub const META_LAST_FULL_SCAN: &'static str = "last_full_scan";
    pub const META_LAST_GENERATION: &'static str = "last_generation";
}

/// Indexer pass settings.
pub struct IndexerConfig;

impl IndexerConfig {
    /// Upserts per committed transaction.
    pub const BATCH_SIZE: usize = 800;
    /// Minimum spacing between progress events for one root.
    pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);
    /// Directory names skipped outright during a walk.
    pub const SKIP_DIR_NAMES: &'static [&'static str] = &[
        "System Volume Information",
        "$RECYCLE.BIN",
        "$Recycle.Bin",
        "Windows",
        "Windows.old",
        "AppData",
        "node_modules",
        ".git",
        ".svn",
    ];
}

/// Search fan-in settings.
pub struct SearchConfig;

impl SearchConfig {
    pub const DEFAULT_LIMIT: usize = 5000;
    /// Hits per streamed batch.
    pub const BATCH_SIZE: usize = 100;
    pub const HOST_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_reasonable() {
        assert!(IndexerConfig::BATCH_SIZE > 0);
        assert!(SearchConfig::BATCH_SIZE <= SearchConfig::DEFAULT_LIMIT);
        assert!(StoreConfig::BUSY_TIMEOUT_MS >= 1_000);
        assert!(IndexerConfig::SKIP_DIR_NAMES.contains(&".git"));
    }
}
