//! Root registration and status.

use crate::error::{PartSearchError, Result};
use crate::index::IndexStore;
use crate::platform::{candidate_roots, canonical_key, display_path};
use crate::registry::IndexRoot;
use crate::PartSearch;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What the index currently knows about one root.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootStatus {
    pub path: String,
    pub enabled: bool,
    /// Rows in the root's store; zero when it has never been scanned.
    pub indexed_files: u64,
    pub last_full_scan: Option<DateTime<Utc>>,
    pub scanning: bool,
}

impl RootStatus {
    /// Last full scan in local time, or "Never".
    pub fn last_scan_text(&self) -> String {
        match self.last_full_scan {
            Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            None => "Never".to_string(),
        }
    }
}

impl PartSearch {
    /// Register an existing directory, enabled. Registering a root again
    /// under another spelling merges into the first registration.
    pub fn register_root(&self, path: &str) -> Result<IndexRoot> {
        let dir = Path::new(path.trim());
        if !dir.exists() {
            return Err(PartSearchError::RootNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(PartSearchError::NotADirectory(dir.to_path_buf()));
        }
        let root = self.registry.register(&display_path(dir))?;
        info!(root = %root.path, "Registered root");
        Ok(root)
    }

    pub fn set_root_enabled(&self, path: &str, enabled: bool) -> Result<IndexRoot> {
        self.registry.set_enabled(path, enabled)
    }

    /// Deregister a root, optionally deleting its index store. A root that
    /// is being scanned cannot be removed, and no scan of it can start
    /// until the removal is finished.
    pub fn remove_root(&self, path: &str, delete_store: bool) -> Result<Option<IndexRoot>> {
        let _reservation = self.indexer.reserve(path)?;
        let removed = self.registry.remove(path)?;

        if delete_store {
            let db_path = self.paths.store_path(path);
            if let Some(store_dir) = db_path.parent().filter(|dir| dir.is_dir()) {
                std::fs::remove_dir_all(store_dir)
                    .map_err(|e| PartSearchError::io_with_path(e, store_dir))?;
                info!(root = path, "Deleted index store");
            }
        }
        Ok(removed)
    }

    pub fn list_roots(&self) -> Result<Vec<IndexRoot>> {
        self.registry.list()
    }

    /// Likely starting directories that are not registered yet.
    pub fn suggest_roots(&self) -> Result<Vec<PathBuf>> {
        let registered: HashSet<String> = self.registry.list()?.iter().map(IndexRoot::key).collect();
        Ok(candidate_roots()
            .into_iter()
            .filter(|dir| !registered.contains(&canonical_key(&dir.to_string_lossy())))
            .collect())
    }

    /// Status of a registered root, read through a read-only connection.
    pub fn root_status(&self, path: &str) -> Result<RootStatus> {
        let root = self
            .registry
            .get(path)?
            .ok_or_else(|| PartSearchError::RootNotFound(PathBuf::from(path)))?;

        let db_path = self.paths.store_path(&root.path);
        let (indexed_files, last_full_scan) = if db_path.is_file() {
            match Self::read_store_status(&db_path, &root.path) {
                Ok(status) => status,
                Err(e) => {
                    warn!(root = %root.path, "Could not read index store: {}", e);
                    (0, None)
                }
            }
        } else {
            (0, None)
        };

        Ok(RootStatus {
            scanning: self.indexer.is_scanning(&root.path),
            path: root.path,
            enabled: root.enabled,
            indexed_files,
            last_full_scan,
        })
    }

    /// Status of every registered root.
    pub fn all_root_status(&self) -> Result<Vec<RootStatus>> {
        self.registry
            .list()?
            .iter()
            .map(|root| self.root_status(&root.path))
            .collect()
    }

    fn read_store_status(db_path: &Path, root: &str) -> Result<(u64, Option<DateTime<Utc>>)> {
        let store = IndexStore::open_read_only(db_path, root)?;
        Ok((store.count()?, store.last_scan_timestamp()?))
    }
}
