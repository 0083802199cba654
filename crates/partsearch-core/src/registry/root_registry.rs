//! JSON-backed registry of indexable roots.

use crate::config::AppConfig;
use crate::metadata::{atomic_read_json, atomic_write_json};
use crate::platform::canonical_key;
use crate::{PartSearchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// A directory registered for indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRoot {
    /// Display form of the root, as the operator entered it.
    pub path: String,
    #[serde(default = "default_enabled", alias = "checked")]
    pub enabled: bool,
    #[serde(default, alias = "files_count")]
    pub file_count: u64,
    #[serde(default, alias = "updated_count")]
    pub updated_count: u64,
    /// Completion time of the last non-cancelled full pass.
    #[serde(default, alias = "last_full_scan", with = "scan_time")]
    pub last_full_scan: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl IndexRoot {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into().trim().to_string(),
            enabled: true,
            file_count: 0,
            updated_count: 0,
            last_full_scan: None,
        }
    }

    /// Canonical lookup key for this root.
    pub fn key(&self) -> String {
        canonical_key(&self.path)
    }
}

/// A partial change to a registry entry.
///
/// Fields left unset keep the stored value, so flipping `enabled` never
/// disturbs the counters written by the last scan.
#[derive(Debug, Clone, Default)]
pub struct RootUpdate {
    path: String,
    enabled: Option<bool>,
    file_count: Option<u64>,
    updated_count: Option<u64>,
    last_full_scan: Option<DateTime<Utc>>,
}

impl RootUpdate {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into().trim().to_string(),
            ..Default::default()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn counts(mut self, file_count: u64, updated_count: u64) -> Self {
        self.file_count = Some(file_count);
        self.updated_count = Some(updated_count);
        self
    }

    pub fn last_full_scan(mut self, at: DateTime<Utc>) -> Self {
        self.last_full_scan = Some(at);
        self
    }

    fn apply(self, root: &mut IndexRoot) {
        if let Some(enabled) = self.enabled {
            root.enabled = enabled;
        }
        if let Some(file_count) = self.file_count {
            root.file_count = file_count;
        }
        if let Some(updated_count) = self.updated_count {
            root.updated_count = updated_count;
        }
        if let Some(at) = self.last_full_scan {
            root.last_full_scan = Some(at);
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    roots: Vec<IndexRoot>,
}

fn default_version() -> u32 {
    AppConfig::REGISTRY_VERSION
}

impl Default for RegistryDocument {
    fn default() -> Self {
        Self {
            version: AppConfig::REGISTRY_VERSION,
            roots: Vec::new(),
        }
    }
}

impl RegistryDocument {
    /// Drop blank paths and fold entries whose key repeats an earlier one.
    fn normalized(mut self) -> Self {
        let mut seen = HashSet::new();
        self.roots.retain_mut(|root| {
            root.path = root.path.trim().to_string();
            !root.path.is_empty() && seen.insert(root.key())
        });
        self
    }
}

/// The authoritative list of roots, persisted as a JSON document.
///
/// Read-modify-write cycles are serialized within the process; the document
/// itself is replaced atomically so other processes never see a torn write.
pub struct RootRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RootRegistry {
    /// Use the registry document at `path`. Nothing is read until needed.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All registered roots in registration order.
    ///
    /// A malformed document is reported as [`PartSearchError::RegistryCorrupt`].
    pub fn list(&self) -> Result<Vec<IndexRoot>> {
        Ok(self.read_document()?.roots)
    }

    /// Registered roots that searches and default scans should include.
    pub fn enabled_roots(&self) -> Result<Vec<IndexRoot>> {
        Ok(self.list()?.into_iter().filter(|r| r.enabled).collect())
    }

    /// Find a root by any spelling of its path.
    pub fn get(&self, path: &str) -> Result<Option<IndexRoot>> {
        let key = canonical_key(path);
        Ok(self.list()?.into_iter().find(|r| r.key() == key))
    }

    /// Insert a root or merge the update into the existing entry with the
    /// same canonical key. The first-registered display path is kept.
    pub fn upsert(&self, update: RootUpdate) -> Result<IndexRoot> {
        if update.path.is_empty() {
            return Err(PartSearchError::Config {
                message: "Root path must not be empty".to_string(),
            });
        }
        self.modify(|roots| {
            let key = canonical_key(&update.path);
            let index = match roots.iter().position(|r| r.key() == key) {
                Some(index) => index,
                None => {
                    roots.push(IndexRoot::new(update.path.clone()));
                    roots.len() - 1
                }
            };
            update.apply(&mut roots[index]);
            Ok(roots[index].clone())
        })
    }

    /// Register a root as enabled, keeping any counters it already has.
    pub fn register(&self, path: &str) -> Result<IndexRoot> {
        self.upsert(RootUpdate::new(path).enabled(true))
    }

    /// Flip the enabled flag of an existing root.
    pub fn set_enabled(&self, path: &str, enabled: bool) -> Result<IndexRoot> {
        if self.get(path)?.is_none() {
            return Err(PartSearchError::RootNotFound(PathBuf::from(path)));
        }
        self.upsert(RootUpdate::new(path).enabled(enabled))
    }

    /// Store the totals of a finished pass. `completed_at` is only given
    /// for full passes that ran to completion.
    pub fn record_scan(
        &self,
        path: &str,
        file_count: u64,
        updated_count: u64,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<IndexRoot> {
        let mut update = RootUpdate::new(path).counts(file_count, updated_count);
        if let Some(at) = completed_at {
            update = update.last_full_scan(at);
        }
        self.upsert(update)
    }

    /// Deregister a root. Returns the removed entry, if there was one.
    pub fn remove(&self, path: &str) -> Result<Option<IndexRoot>> {
        let key = canonical_key(path);
        self.modify(|roots| {
            let removed = roots
                .iter()
                .position(|r| r.key() == key)
                .map(|index| roots.remove(index));
            Ok(removed)
        })
    }

    fn read_document(&self) -> Result<RegistryDocument> {
        match atomic_read_json::<RegistryDocument>(&self.path) {
            Ok(Some(doc)) => {
                if doc.version > AppConfig::REGISTRY_VERSION {
                    warn!(
                        "Root registry {} has newer version {}",
                        self.path.display(),
                        doc.version
                    );
                }
                Ok(doc.normalized())
            }
            Ok(None) => Ok(RegistryDocument::default()),
            Err(PartSearchError::Json { message, .. }) => Err(PartSearchError::RegistryCorrupt {
                path: self.path.clone(),
                message,
            }),
            Err(e) => Err(e),
        }
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Vec<IndexRoot>) -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.lock().map_err(|_| PartSearchError::Other(
            "Failed to acquire registry lock".to_string(),
        ))?;

        let mut doc = match self.read_document() {
            Ok(doc) => doc,
            Err(PartSearchError::RegistryCorrupt { path, message }) => {
                warn!(
                    "Replacing corrupt root registry {}: {}",
                    path.display(),
                    message
                );
                RegistryDocument::default()
            }
            Err(e) => return Err(e),
        };

        let result = f(&mut doc.roots)?;
        doc.version = AppConfig::REGISTRY_VERSION;
        atomic_write_json(&self.path, &doc, true)?;
        debug!(roots = doc.roots.len(), "Saved root registry");
        Ok(result)
    }
}

/// Scan timestamps are written as RFC 3339 and read leniently.
mod scan_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_some(&at.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(crate::metadata::parse_timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn registry() -> (RootRegistry, TempDir) {
        let temp = TempDir::new().unwrap();
        let registry = RootRegistry::new(temp.path().join("index_roots.json"));
        (registry, temp)
    }

    #[test]
    fn test_missing_document_is_empty() {
        let (registry, _temp) = registry();
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_register_and_list() {
        let (registry, _temp) = registry();
        registry.register("/srv/cad").unwrap();
        registry.register("/srv/docs").unwrap();

        let roots = registry.list().unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].path, "/srv/cad");
        assert!(roots.iter().all(|r| r.enabled));
    }

    #[test]
    fn test_upsert_merges_by_canonical_key() {
        let (registry, _temp) = registry();
        registry.register(r"C:\Data\CAD").unwrap();
        registry
            .record_scan("c:/data/cad/", 120, 7, None)
            .unwrap();

        let roots = registry.list().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].path, r"C:\Data\CAD");
        assert_eq!(roots[0].file_count, 120);
        assert_eq!(roots[0].updated_count, 7);
    }

    #[test]
    fn test_set_enabled_preserves_counters() {
        let (registry, _temp) = registry();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        registry.register("/srv/cad").unwrap();
        registry.record_scan("/srv/cad", 50, 50, Some(at)).unwrap();

        let root = registry.set_enabled("/SRV/CAD", false).unwrap();
        assert!(!root.enabled);
        assert_eq!(root.file_count, 50);
        assert_eq!(root.last_full_scan, Some(at));
        assert!(registry.enabled_roots().unwrap().is_empty());
    }

    #[test]
    fn test_set_enabled_unknown_root() {
        let (registry, _temp) = registry();
        let err = registry.set_enabled("/nowhere", true).unwrap_err();
        assert!(matches!(err, PartSearchError::RootNotFound(_)));
    }

    #[test]
    fn test_remove() {
        let (registry, _temp) = registry();
        registry.register("/srv/cad").unwrap();
        registry.register("/srv/docs").unwrap();

        let removed = registry.remove("/srv/CAD/").unwrap();
        assert_eq!(removed.map(|r| r.path), Some("/srv/cad".to_string()));
        assert!(registry.remove("/srv/cad").unwrap().is_none());
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_reads_legacy_document() {
        let (registry, _temp) = registry();
        std::fs::write(
            registry.path(),
            r#"{"roots":[
                {"path":"/srv/cad","checked":false,"files_count":10,"updated_count":2,
                 "last_full_scan":"2025-11-02 14:30"},
                {"path":"/SRV/CAD/","checked":true},
                {"path":"  "}
            ]}"#,
        )
        .unwrap();

        let roots = registry.list().unwrap();
        assert_eq!(roots.len(), 1);
        assert!(!roots[0].enabled);
        assert_eq!(roots[0].file_count, 10);
        assert_eq!(
            roots[0].last_full_scan,
            Some(Utc.with_ymd_and_hms(2025, 11, 2, 14, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_writes_camel_case_document() {
        let (registry, _temp) = registry();
        registry.register("/srv/cad").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(registry.path()).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["roots"][0]["fileCount"], 0);
        assert_eq!(raw["roots"][0]["enabled"], true);
        assert!(raw["roots"][0]["lastFullScan"].is_null());
    }

    #[test]
    fn test_corrupt_document_fails_list_and_is_replaced_on_write() {
        let (registry, _temp) = registry();
        std::fs::write(registry.path(), "{\"roots\": [").unwrap();

        let err = registry.list().unwrap_err();
        assert!(matches!(err, PartSearchError::RegistryCorrupt { .. }));

        registry.register("/srv/cad").unwrap();
        assert_eq!(registry.list().unwrap().len(), 1);
    }
}
