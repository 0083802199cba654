//! Multi-source search.
//!
//! A query fans out to a fixed, ordered list of [`Provider`]s:
//! - [`IndexStoreProvider`] - the per-root index stores, read-only
//! - [`HostSearchProvider`] - the operating system's search facility, with
//!   the live crawl as its fallback
//! - [`CrawlProvider`] - a direct walk of the allowed roots
//!
//! [`SearchEngine`] concatenates their hits in that order, drops duplicate
//! paths, enforces the global limit and streams [`SearchEvent`] batches.

mod crawl_provider;
mod engine;
mod host_backends;
mod host_provider;
mod index_provider;
mod kind;

pub use crawl_provider::CrawlProvider;
pub use engine::{SearchEngine, SearchEvent, SearchHandle, SearchOutcome};
pub use host_backends::{default_backend, LocateSearch, SpotlightSearch, WindowsSearch};
pub use host_provider::{HostSearch, HostSearchProvider};
pub use index_provider::IndexStoreProvider;
pub use kind::{format_size, FileKind};

use crate::cancel::CancellationToken;
use crate::config::SearchConfig;
use crate::index::FileEntry;
use crate::platform::canonical_key;
use crate::query::ParsedQuery;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which provider produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceTag {
    Index,
    Host,
    Crawl,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceTag::Index => "index",
            SourceTag::Host => "host",
            SourceTag::Crawl => "crawl",
        };
        f.write_str(label)
    }
}

/// A search result, whatever produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub path: String,
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    /// Modification time, epoch seconds.
    pub modified: Option<f64>,
    pub kind: FileKind,
    pub source: SourceTag,
}

impl SearchHit {
    pub fn new(
        path: impl Into<String>,
        is_dir: bool,
        size: Option<u64>,
        modified: Option<f64>,
        source: SourceTag,
    ) -> Self {
        let path = path.into();
        let name = name_of(&path);
        let kind = FileKind::classify(&name, is_dir);
        Self {
            path,
            name,
            is_dir,
            size: if is_dir { None } else { size },
            modified,
            kind,
            source,
        }
    }

    /// Build a hit from a path on disk, or `None` if it cannot be stat'ed.
    pub fn from_path(path: &Path, source: SourceTag) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        let entry = FileEntry::from_metadata("", path, &metadata);
        Some(Self::from_entry(entry, source))
    }

    pub fn from_entry(entry: FileEntry, source: SourceTag) -> Self {
        let kind = FileKind::classify(&entry.name, entry.is_dir);
        Self {
            path: entry.path,
            name: entry.name,
            is_dir: entry.is_dir,
            size: entry.size,
            modified: entry.modified,
            kind,
            source,
        }
    }

    /// Dedup key across providers.
    pub fn key(&self) -> String {
        canonical_key(&self.path)
    }
}

/// Last path segment, tolerating either separator and trailing ones.
fn name_of(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(path)
        .to_string()
}

/// What a provider is asked for.
pub struct ProviderRequest<'a> {
    pub query: &'a ParsedQuery,
    /// Restrict results to these roots; empty means no restriction.
    pub allowed_roots: &'a [PathBuf],
    /// Slots left in the global limit.
    pub limit: usize,
    pub cancel: &'a CancellationToken,
}

/// Hits from one provider, plus notes the caller should see.
#[derive(Debug, Default)]
pub struct ProviderOutput {
    pub hits: Vec<SearchHit>,
    pub advisories: Vec<String>,
}

impl From<Vec<SearchHit>> for ProviderOutput {
    fn from(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            advisories: Vec::new(),
        }
    }
}

/// A source of search hits.
///
/// Providers run on a blocking worker and should check
/// `request.cancel` between rows where they can.
pub trait Provider: Send + Sync {
    fn source(&self) -> SourceTag;

    fn search(&self, request: &ProviderRequest<'_>) -> Result<ProviderOutput>;
}

/// One search as the caller describes it.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// Restrict every provider to these roots; empty means unrestricted.
    pub allowed_roots: Vec<PathBuf>,
    pub limit: usize,
    /// Treat the whole query as one phrase.
    pub ordered: bool,
    pub use_index: bool,
    pub use_host: bool,
    pub use_crawl: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        self.allowed_roots = roots.into_iter().collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn parsed(&self) -> ParsedQuery {
        ParsedQuery::parse(&self.query, self.ordered)
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            allowed_roots: Vec::new(),
            limit: SearchConfig::DEFAULT_LIMIT,
            ordered: false,
            use_index: true,
            use_host: true,
            use_crawl: false,
        }
    }
}
