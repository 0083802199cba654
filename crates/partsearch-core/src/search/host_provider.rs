//! Hits from the operating system's search facility.

use super::crawl_provider::CrawlProvider;
use super::{Provider, ProviderOutput, ProviderRequest, SearchHit, SourceTag};
use crate::cancel::CancellationToken;
use crate::query::HostQuery;
use crate::{PartSearchError, Result};
use crate::platform::canonical_key;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// A platform search facility.
///
/// Backends answer the broad prefix form of a query; the provider narrows
/// their hits with the query's exact semantics afterwards.
pub trait HostSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Run the query. A backend that waits on the platform should give up
    /// with [`PartSearchError::Cancelled`] once `cancel` is set.
    fn search(
        &self,
        query: &HostQuery,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>>;
}

/// Delegates to a [`HostSearch`] backend, falling back to a live crawl when
/// there is none or it fails.
pub struct HostSearchProvider {
    backend: Option<Arc<dyn HostSearch>>,
    fallback: CrawlProvider,
}

impl HostSearchProvider {
    pub fn new(backend: Option<Arc<dyn HostSearch>>, fallback: CrawlProvider) -> Self {
        Self { backend, fallback }
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|backend| backend.name())
    }

    fn query_backend(
        backend: &dyn HostSearch,
        request: &ProviderRequest<'_>,
    ) -> Result<Vec<SearchHit>> {
        let matcher = request.query.matcher()?;
        let host_query = request.query.to_host(request.allowed_roots);
        let raw = backend.search(&host_query, request.limit, request.cancel)?;
        debug!(backend = backend.name(), hits = raw.len(), "Host search returned");

        let mut hits = Vec::new();
        for mut hit in raw {
            request.cancel.check()?;
            if hits.len() >= request.limit {
                break;
            }
            if !in_scope(&hit.path, request.allowed_roots) || !matcher.matches(&hit.name, &hit.path) {
                continue;
            }
            hit.source = SourceTag::Host;
            hits.push(hit);
        }
        Ok(hits)
    }
}

impl Provider for HostSearchProvider {
    fn source(&self) -> SourceTag {
        SourceTag::Host
    }

    fn search(&self, request: &ProviderRequest<'_>) -> Result<ProviderOutput> {
        let failure = match self.backend.as_deref() {
            Some(backend) => match Self::query_backend(backend, request) {
                Ok(hits) => return Ok(hits.into()),
                Err(PartSearchError::Cancelled) => return Err(PartSearchError::Cancelled),
                Err(e) => format!("{} unavailable ({})", backend.name(), e),
            },
            None => "no host search on this platform".to_string(),
        };

        warn!("Host search fell back to live crawl: {}", failure);
        let mut output = self.fallback.search(request)?;
        output
            .advisories
            .insert(0, format!("Host search: {}; used live crawl", failure));
        Ok(output)
    }
}

/// Whether `path` lies under one of `roots`, compared by canonical key.
/// An empty root list admits everything.
fn in_scope(path: &str, roots: &[PathBuf]) -> bool {
    if roots.is_empty() {
        return true;
    }
    let key = canonical_key(path);
    roots.iter().any(|root| {
        let root_key = canonical_key(&root.to_string_lossy());
        key == root_key
            || key
                .strip_prefix(root_key.trim_end_matches('/'))
                .is_some_and(|rest| rest.starts_with('/'))
    })
}
