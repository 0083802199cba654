//! Fan-in of provider results.

use super::{Provider, ProviderRequest, SearchHit, SourceTag};
use crate::cancel::CancellationToken;
use crate::config::SearchConfig;
use crate::query::ParsedQuery;
use crate::{PartSearchError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Streamed to the caller while a search runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SearchEvent {
    /// New, deduplicated hits in provider-priority order.
    Batch { hits: Vec<SearchHit> },
    /// A provider failed or degraded; the search carries on.
    Advisory { message: String },
    /// Always the last event.
    Done(SearchOutcome),
}

/// Final result of a search. When cancelled, `hits` holds exactly what was
/// streamed before cancellation was observed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub cancelled: bool,
    /// Sources that contributed at least one hit, in first-seen order.
    pub sources: Vec<SourceTag>,
    pub advisories: Vec<String>,
}

/// Handle to a running search.
pub struct SearchHandle {
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<SearchEvent>,
    join: JoinHandle<SearchOutcome>,
}

impl SearchHandle {
    /// Stop emitting batches. Already delivered batches stay valid.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn next_event(&mut self) -> Option<SearchEvent> {
        self.events.recv().await
    }

    pub async fn wait(self) -> Result<SearchOutcome> {
        self.join
            .await
            .map_err(|e| PartSearchError::Other(format!("Search worker failed: {}", e)))
    }
}

/// Runs an ordered list of providers for one query.
pub struct SearchEngine {
    providers: Vec<Arc<dyn Provider>>,
    batch_size: usize,
}

impl SearchEngine {
    /// Providers are consulted in the order given.
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            batch_size: SearchConfig::BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run the search on a blocking worker. Must be called from within a
    /// Tokio runtime.
    pub fn start(
        self,
        query: ParsedQuery,
        allowed_roots: Vec<PathBuf>,
        limit: usize,
    ) -> SearchHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let join = tokio::task::spawn_blocking(move || {
            let outcome = self.run(&query, &allowed_roots, limit, &worker_cancel, &tx);
            let _ = tx.send(SearchEvent::Done(outcome.clone()));
            outcome
        });

        SearchHandle {
            cancel,
            events: rx,
            join,
        }
    }

    /// Run every provider in order on the current thread, sending batches
    /// and advisories to `events`. The returned outcome is not sent.
    pub fn run(
        &self,
        query: &ParsedQuery,
        allowed_roots: &[PathBuf],
        limit: usize,
        cancel: &CancellationToken,
        events: &mpsc::UnboundedSender<SearchEvent>,
    ) -> SearchOutcome {
        let start = Instant::now();
        let mut merge = Merge::new(limit, self.batch_size, events);

        for provider in &self.providers {
            if cancel.is_cancelled() {
                merge.cancelled = true;
                break;
            }
            let remaining = merge.remaining();
            if remaining == 0 {
                break;
            }

            let request = ProviderRequest {
                query,
                allowed_roots,
                limit: remaining,
                cancel,
            };
            let source = provider.source();
            match provider.search(&request) {
                Ok(output) => {
                    debug!(%source, hits = output.hits.len(), "Provider finished");
                    for message in output.advisories {
                        merge.advise(message);
                    }
                    merge.absorb(output.hits, cancel);
                }
                Err(PartSearchError::Cancelled) => merge.cancelled = true,
                Err(e) => {
                    warn!(%source, "Provider failed: {}", e);
                    merge.advise(format!("{} search failed: {}", source, e));
                }
            }
            if merge.cancelled {
                break;
            }
        }

        let outcome = merge.finish();
        info!(
            hits = outcome.hits.len(),
            cancelled = outcome.cancelled,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Search complete"
        );
        outcome
    }
}

/// Dedup, cap and batching state for one search.
struct Merge<'a> {
    limit: usize,
    batch_size: usize,
    events: &'a mpsc::UnboundedSender<SearchEvent>,
    seen: HashSet<String>,
    delivered: Vec<SearchHit>,
    pending: Vec<SearchHit>,
    sources: Vec<SourceTag>,
    advisories: Vec<String>,
    cancelled: bool,
}

impl<'a> Merge<'a> {
    fn new(limit: usize, batch_size: usize, events: &'a mpsc::UnboundedSender<SearchEvent>) -> Self {
        Self {
            limit,
            batch_size,
            events,
            seen: HashSet::new(),
            delivered: Vec::new(),
            pending: Vec::new(),
            sources: Vec::new(),
            advisories: Vec::new(),
            cancelled: false,
        }
    }

    fn remaining(&self) -> usize {
        self.limit
            .saturating_sub(self.delivered.len() + self.pending.len())
    }

    fn advise(&mut self, message: String) {
        let _ = self.events.send(SearchEvent::Advisory {
            message: message.clone(),
        });
        self.advisories.push(message);
    }

    /// Take one provider's hits; first path wins, later duplicates drop.
    fn absorb(&mut self, hits: Vec<SearchHit>, cancel: &CancellationToken) {
        for hit in hits {
            if self.remaining() == 0 {
                break;
            }
            if !self.seen.insert(hit.key()) {
                continue;
            }
            self.pending.push(hit);
            if self.pending.len() >= self.batch_size {
                self.flush(cancel);
                if self.cancelled {
                    return;
                }
            }
        }
        self.flush(cancel);
    }

    fn flush(&mut self, cancel: &CancellationToken) {
        if self.pending.is_empty() {
            return;
        }
        if cancel.is_cancelled() {
            self.cancelled = true;
            self.pending.clear();
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        for hit in &batch {
            if !self.sources.contains(&hit.source) {
                self.sources.push(hit.source);
            }
        }
        self.delivered.extend(batch.iter().cloned());
        let _ = self.events.send(SearchEvent::Batch { hits: batch });
    }

    fn finish(self) -> SearchOutcome {
        SearchOutcome {
            hits: self.delivered,
            cancelled: self.cancelled,
            sources: self.sources,
            advisories: self.advisories,
        }
    }
}
