//! PartSearch Core - headless local file indexing and multi-source search.
//!
//! Registered roots are walked into per-root SQLite index stores. Searches
//! fan out to those stores, the operating system's search facility and a
//! live crawl, and stream back deduplicated hits.
//!
//! # Example
//!
//! ```rust,ignore
//! use partsearch_core::{IndexOptions, PartSearch, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> partsearch_core::Result<()> {
//!     let app = PartSearch::builder("/var/lib/partsearch")
//!         .auto_create_dirs(true)
//!         .build()?;
//!
//!     app.register_root("/srv/cad")?;
//!     let reports = app.start_index(None, IndexOptions::default())?.wait().await?;
//!     println!("Indexed {} roots", reports.len());
//!
//!     let outcome = app.search(SearchRequest::new("bracket *.sldprt")).await?;
//!     println!("{} hits", outcome.hits.len());
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod metadata;
pub mod platform;
pub mod query;
pub mod registry;
pub mod search;

mod api;

// Re-export commonly used types
pub use api::{PartSearchBuilder, RootStatus};
pub use cancel::{CancellationToken, CancelledError};
pub use error::{PartSearchError, Result};
pub use index::{FileEntry, IndexStore};
pub use indexer::{
    IndexEvent, IndexHandle, IndexOptions, Indexer, ScanOutcome, ScanProgress, ScanReport,
    SkipCounts,
};
pub use platform::DataPaths;
pub use query::ParsedQuery;
pub use registry::{IndexRoot, RootRegistry};
pub use search::{
    FileKind, HostSearch, SearchEvent, SearchHandle, SearchHit, SearchOutcome, SearchRequest,
    SourceTag,
};

use std::path::PathBuf;
use std::sync::Arc;

/// Entry point for operators and collaborators.
///
/// Owns the root registry, the indexer (and with it the set of roots being
/// scanned) and the search provider configuration. Methods live in the
/// `api` submodules.
pub struct PartSearch {
    paths: DataPaths,
    registry: Arc<RootRegistry>,
    indexer: Indexer,
    /// `None` disables host search entirely, fallback included.
    host_search: Option<HostSearchSetting>,
    crawl_roots: Vec<PathBuf>,
}

/// Host search is enabled; the backend may still be absent on this platform.
#[derive(Clone)]
struct HostSearchSetting {
    backend: Option<Arc<dyn HostSearch>>,
}

impl PartSearch {
    /// Create a builder for more control over initialization.
    pub fn builder(data_dir: impl Into<PathBuf>) -> PartSearchBuilder {
        PartSearchBuilder::new(data_dir)
    }

    /// Open `data_dir`, creating it if needed, with default settings.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(data_dir).auto_create_dirs(true).build()
    }

    /// Open the platform local data directory.
    pub fn platform_default() -> Result<Self> {
        let paths = DataPaths::platform_default()?;
        Self::new(paths.data_dir())
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn registry(&self) -> &RootRegistry {
        &self.registry
    }
}
