//! Search entry points.

use crate::error::Result;
use crate::search::{
    CrawlProvider, HostSearchProvider, IndexStoreProvider, Provider, SearchEngine, SearchEvent,
    SearchHandle, SearchOutcome, SearchRequest,
};
use crate::PartSearch;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

impl PartSearch {
    /// Start a search and stream its events. Must be called from within a
    /// Tokio runtime.
    pub fn start_search(&self, request: SearchRequest) -> SearchHandle {
        let providers = self.providers_for(&request);
        debug!(
            query = %request.query,
            providers = providers.len(),
            limit = request.limit,
            "Starting search"
        );
        SearchEngine::new(providers).start(request.parsed(), request.allowed_roots, request.limit)
    }

    /// Run a search to completion, discarding intermediate events.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchOutcome> {
        let mut handle = self.start_search(request);
        while let Some(event) = handle.next_event().await {
            if let SearchEvent::Done(outcome) = event {
                return Ok(outcome);
            }
        }
        handle.wait().await
    }

    /// Search for files related to a part: the seed (usually a part number)
    /// is the query, optionally scoped to some roots.
    pub fn search_for_part(&self, seed: &str, scope: Option<Vec<PathBuf>>) -> SearchHandle {
        let request = SearchRequest::new(seed.trim()).with_roots(scope.unwrap_or_default());
        self.start_search(request)
    }

    /// Providers in priority order: index stores, host search, live crawl.
    fn providers_for(&self, request: &SearchRequest) -> Vec<Arc<dyn Provider>> {
        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
        let crawl = CrawlProvider::new(self.crawl_roots.clone());

        if request.use_index {
            providers.push(Arc::new(IndexStoreProvider::new(
                self.paths.clone(),
                Arc::clone(&self.registry),
            )));
        }
        if request.use_host {
            if let Some(host) = &self.host_search {
                // Without a backend the host provider is a crawl; walk once.
                if host.backend.is_some() || !request.use_crawl {
                    providers.push(Arc::new(HostSearchProvider::new(
                        host.backend.clone(),
                        crawl.clone(),
                    )));
                }
            }
        }
        if request.use_crawl {
            providers.push(Arc::new(crawl));
        }
        providers
    }
}
