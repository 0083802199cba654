//! Builder for configuring PartSearch initialization.

use crate::error::{PartSearchError, Result};
use crate::platform::{candidate_roots, current_platform, DataPaths};
use crate::registry::RootRegistry;
use crate::search::{default_backend, HostSearch};
use crate::{HostSearchSetting, Indexer, PartSearch};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Builder for configuring PartSearch initialization.
///
/// # Example
///
/// ```rust,ignore
/// use partsearch_core::PartSearch;
///
/// let app = PartSearch::builder("./partsearch-data")
///     .auto_create_dirs(true)
///     .with_host_search(false)
///     .build()?;
/// ```
pub struct PartSearchBuilder {
    data_dir: PathBuf,
    auto_create_dirs: bool,
    registry_path: Option<PathBuf>,
    enable_host_search: bool,
    host_backend: Option<Arc<dyn HostSearch>>,
    crawl_default_roots: Option<Vec<PathBuf>>,
}

impl PartSearchBuilder {
    /// Create a new builder with the data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            auto_create_dirs: false,
            registry_path: None,
            enable_host_search: true,
            host_backend: None,
            crawl_default_roots: None,
        }
    }

    /// Create the data directory and its `index/` directory if missing.
    ///
    /// Default: `false` (the data directory must exist)
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Keep the root registry document somewhere other than the data
    /// directory.
    pub fn registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    /// Enable or disable the host search provider. When disabled, searches
    /// never consult the operating system and never fall back to a crawl on
    /// its behalf.
    ///
    /// Default: `true`
    pub fn with_host_search(mut self, enable: bool) -> Self {
        self.enable_host_search = enable;
        self
    }

    /// Use this backend instead of the platform default.
    pub fn host_search_backend(mut self, backend: Arc<dyn HostSearch>) -> Self {
        self.host_backend = Some(backend);
        self
    }

    /// Roots the live crawl walks when a search names none.
    ///
    /// Default: [`candidate_roots`]
    pub fn crawl_default_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.crawl_default_roots = Some(roots);
        self
    }

    fn create_dir(dir: &Path) -> Result<()> {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| PartSearchError::Io {
                message: format!("Failed to create directory: {}", dir.display()),
                path: Some(dir.to_path_buf()),
                source: Some(e),
            })?;
        }
        Ok(())
    }

    /// Build the PartSearch instance.
    pub fn build(self) -> Result<PartSearch> {
        let mut paths = DataPaths::new(&self.data_dir);
        if let Some(registry_path) = self.registry_path {
            paths = paths.with_registry_path(registry_path);
        }

        if self.auto_create_dirs {
            Self::create_dir(paths.data_dir())?;
            Self::create_dir(&paths.index_dir())?;
        } else if !paths.data_dir().is_dir() {
            return Err(PartSearchError::Config {
                message: format!("Data directory does not exist: {}", paths.data_dir().display()),
            });
        }

        let registry = Arc::new(RootRegistry::new(paths.registry_path()));
        let indexer = Indexer::new(paths.clone(), Arc::clone(&registry));

        let host_search = if self.enable_host_search {
            let backend = self.host_backend.or_else(default_backend);
            match &backend {
                Some(backend) => debug!(backend = backend.name(), "Host search enabled"),
                None => debug!("No host search backend; searches fall back to a live crawl"),
            }
            Some(HostSearchSetting { backend })
        } else {
            None
        };

        let crawl_roots = self.crawl_default_roots.unwrap_or_else(candidate_roots);

        info!(
            data_dir = %paths.data_dir().display(),
            platform = current_platform(),
            "PartSearch initialized"
        );
        Ok(PartSearch {
            paths,
            registry,
            indexer,
            host_search,
            crawl_roots,
        })
    }
}
