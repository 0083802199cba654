//! Index pass entry points.

use crate::error::Result;
use crate::indexer::{IndexHandle, IndexOptions};
use crate::PartSearch;

impl PartSearch {
    /// Start an index pass set.
    ///
    /// With `roots` unset every enabled root is scanned. Named roots that
    /// are not registered yet are registered first; registered ones are
    /// scanned under their registry spelling. Fails with
    /// [`crate::PartSearchError::ScanInProgress`] when any of them is
    /// already being scanned. Must be called from within a Tokio runtime.
    pub fn start_index(
        &self,
        roots: Option<Vec<String>>,
        options: IndexOptions,
    ) -> Result<IndexHandle> {
        let roots = match roots {
            None => self
                .registry
                .enabled_roots()?
                .into_iter()
                .map(|root| root.path)
                .collect(),
            Some(requested) => requested
                .iter()
                .map(|path| match self.registry.get(path)? {
                    Some(root) => Ok(root.path),
                    None => self.register_root(path).map(|root| root.path),
                })
                .collect::<Result<Vec<_>>>()?,
        };
        self.indexer.start(roots, options)
    }

    /// Whether a pass for `root` is running.
    pub fn is_indexing(&self, root: &str) -> bool {
        self.indexer.is_scanning(root)
    }
}

#[cfg(test)]
mod tests {
    use crate::{IndexEvent, IndexOptions, PartSearch, PartSearchError};
    use tempfile::TempDir;

    fn app(temp: &TempDir) -> PartSearch {
        PartSearch::builder(temp.path().join("data"))
            .auto_create_dirs(true)
            .with_host_search(false)
            .crawl_default_roots(Vec::new())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_root_is_registered_then_scanned() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);
        let root_dir = temp.path().join("R");
        std::fs::create_dir_all(&root_dir).unwrap();
        std::fs::write(root_dir.join("a.pdf"), b"a").unwrap();
        let root = root_dir.to_string_lossy().to_string();

        let reports = app
            .start_index(Some(vec![root.clone()]), IndexOptions::default())
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].scanned, 2);
        assert_eq!(app.list_roots().unwrap()[0].file_count, 2);
        assert_eq!(app.root_status(&root).unwrap().indexed_files, 2);
    }

    #[tokio::test]
    async fn test_disabled_roots_are_not_scanned_by_default() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);
        let root_dir = temp.path().join("R");
        std::fs::create_dir_all(&root_dir).unwrap();
        let root = root_dir.to_string_lossy().to_string();
        app.register_root(&root).unwrap();
        app.set_root_enabled(&root, false).unwrap();

        let mut handle = app.start_index(None, IndexOptions::default()).unwrap();
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }

        assert!(matches!(events.as_slice(), [IndexEvent::AllDone]));
    }

    #[test]
    fn test_unknown_missing_root_is_rejected_up_front() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);
        let missing = temp.path().join("missing").to_string_lossy().to_string();

        let err = app
            .start_index(Some(vec![missing]), IndexOptions::default())
            .err();
        assert!(matches!(err, Some(PartSearchError::RootNotFound(_))));
    }
}
