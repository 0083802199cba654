//! Hits from the per-root index stores.

use super::{Provider, ProviderOutput, ProviderRequest, SearchHit, SourceTag};
use crate::index::IndexStore;
use crate::platform::{canonical_key, DataPaths};
use crate::registry::RootRegistry;
use crate::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Queries the store of every enabled root through read-only connections.
///
/// A root whose own store does not exist yet may still have rows in a store
/// that multiplexes several roots; every other store is checked for rows
/// carrying that root's identity.
pub struct IndexStoreProvider {
    paths: DataPaths,
    registry: Arc<RootRegistry>,
}

impl IndexStoreProvider {
    pub fn new(paths: DataPaths, registry: Arc<RootRegistry>) -> Self {
        Self { paths, registry }
    }

    /// Enabled roots, narrowed to `allowed` when it is non-empty.
    fn target_roots(&self, allowed: &[PathBuf]) -> Result<Vec<String>> {
        let allowed: HashSet<String> = allowed
            .iter()
            .map(|root| canonical_key(&root.to_string_lossy()))
            .collect();
        Ok(self
            .registry
            .enabled_roots()?
            .into_iter()
            .filter(|root| allowed.is_empty() || allowed.contains(&root.key()))
            .map(|root| root.path)
            .collect())
    }

    /// Open a store read-only; unreadable stores count as empty.
    fn open(db_path: &Path, root: &str) -> Option<IndexStore> {
        match IndexStore::open_read_only(db_path, root) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!("Skipping unreadable store {}: {}", db_path.display(), e);
                None
            }
        }
    }

    fn collect(
        store: &IndexStore,
        request: &ProviderRequest<'_>,
        roots: Option<&[String]>,
        hits: &mut Vec<SearchHit>,
    ) {
        let remaining = request.limit.saturating_sub(hits.len());
        if remaining == 0 {
            return;
        }
        match store.search(request.query, roots, remaining) {
            Ok(entries) => hits.extend(
                entries
                    .into_iter()
                    .map(|entry| SearchHit::from_entry(entry, SourceTag::Index)),
            ),
            Err(e) => warn!("Query failed on {}: {}", store.db_path().display(), e),
        }
    }
}

impl Provider for IndexStoreProvider {
    fn source(&self) -> SourceTag {
        SourceTag::Index
    }

    fn search(&self, request: &ProviderRequest<'_>) -> Result<ProviderOutput> {
        let mut hits = Vec::new();
        let mut queried: HashSet<PathBuf> = HashSet::new();
        let mut missing: HashSet<String> = HashSet::new();

        for root in self.target_roots(request.allowed_roots)? {
            request.cancel.check()?;
            if hits.len() >= request.limit {
                return Ok(hits.into());
            }
            let db_path = self.paths.store_path(&root);
            if !db_path.is_file() {
                missing.insert(canonical_key(&root));
                continue;
            }
            queried.insert(db_path.clone());
            if let Some(store) = Self::open(&db_path, &root) {
                Self::collect(&store, request, None, &mut hits);
            }
        }

        if missing.is_empty() {
            return Ok(hits.into());
        }

        for db_path in self.paths.existing_stores() {
            request.cancel.check()?;
            if hits.len() >= request.limit {
                break;
            }
            if queried.contains(&db_path) {
                continue;
            }
            let Some(store) = Self::open(&db_path, "") else {
                continue;
            };
            let roots: Vec<String> = match store.distinct_roots() {
                Ok(roots) => roots
                    .into_iter()
                    .filter(|root| missing.contains(&canonical_key(root)))
                    .collect(),
                Err(e) => {
                    warn!("Skipping store {}: {}", db_path.display(), e);
                    continue;
                }
            };
            if roots.is_empty() {
                continue;
            }
            debug!(store = %db_path.display(), ?roots, "Found rows for unindexed roots");
            Self::collect(&store, request, Some(&roots), &mut hits);
        }

        Ok(hits.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::index::FileEntry;
    use crate::query::ParsedQuery;
    use tempfile::TempDir;

    fn entry(root: &str, path: &str, modified: f64) -> FileEntry {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        FileEntry {
            root: root.to_string(),
            path: path.to_string(),
            ext: name.rsplit_once('.').map(|(_, e)| e.to_string()).unwrap_or_default(),
            name,
            size: Some(1),
            modified: Some(modified),
            created: None,
            is_dir: false,
            parent: None,
            scan_generation: None,
        }
    }

    fn setup() -> (TempDir, DataPaths, Arc<RootRegistry>) {
        let temp = TempDir::new().unwrap();
        let paths = DataPaths::new(temp.path().join("data"));
        let registry = Arc::new(RootRegistry::new(paths.registry_path()));
        (temp, paths, registry)
    }

    fn search(provider: &IndexStoreProvider, query: &str, allowed: &[PathBuf]) -> Vec<String> {
        let query = ParsedQuery::parse(query, false);
        let cancel = CancellationToken::new();
        let request = ProviderRequest {
            query: &query,
            allowed_roots: allowed,
            limit: 100,
            cancel: &cancel,
        };
        provider
            .search(&request)
            .unwrap()
            .hits
            .into_iter()
            .map(|hit| hit.path)
            .collect()
    }

    #[test]
    fn test_queries_enabled_roots_only() {
        let (_temp, paths, registry) = setup();
        for (root, file) in [("/srv/a", "/srv/a/motor.pdf"), ("/srv/b", "/srv/b/motor.step")] {
            registry.register(root).unwrap();
            let store = IndexStore::open(paths.store_path(root), root).unwrap();
            store.upsert(&entry(root, file, 1.0), 1).unwrap();
        }
        registry.set_enabled("/srv/b", false).unwrap();

        let provider = IndexStoreProvider::new(paths, registry);
        assert_eq!(search(&provider, "motor", &[]), vec!["/srv/a/motor.pdf"]);
    }

    #[test]
    fn test_allowed_roots_narrow_the_stores() {
        let (_temp, paths, registry) = setup();
        for (root, file) in [("/srv/a", "/srv/a/motor.pdf"), ("/srv/b", "/srv/b/motor.step")] {
            registry.register(root).unwrap();
            let store = IndexStore::open(paths.store_path(root), root).unwrap();
            store.upsert(&entry(root, file, 1.0), 1).unwrap();
        }

        let provider = IndexStoreProvider::new(paths, registry);
        let hits = search(&provider, "motor", &[PathBuf::from("/SRV/B/")]);
        assert_eq!(hits, vec!["/srv/b/motor.step"]);
    }

    #[test]
    fn test_falls_back_to_multiplexed_store() {
        let (_temp, paths, registry) = setup();
        registry.register("/srv/shared").unwrap();
        registry.register("/srv/other").unwrap();
        let store = IndexStore::open(paths.store_path("/srv/shared"), "/srv/shared").unwrap();
        store
            .upsert(&entry("/srv/shared", "/srv/shared/bracket.sldprt", 2.0), 1)
            .unwrap();
        store
            .upsert(&entry("/srv/other", "/srv/other/bracket.pdf", 1.0), 1)
            .unwrap();

        let provider = IndexStoreProvider::new(paths, registry);
        let hits = search(&provider, "bracket", &[PathBuf::from("/srv/other")]);
        assert_eq!(hits, vec!["/srv/other/bracket.pdf"]);
    }

    #[test]
    fn test_missing_store_is_empty() {
        let (_temp, paths, registry) = setup();
        registry.register("/srv/never-scanned").unwrap();

        let provider = IndexStoreProvider::new(paths, registry);
        assert!(search(&provider, "", &[]).is_empty());
    }
}
