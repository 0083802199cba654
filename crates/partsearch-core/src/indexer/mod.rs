//! Index passes over registered roots.
//!
//! [`Indexer::start`] returns immediately with an [`IndexHandle`]; the pass
//! set runs on a blocking worker, one root after another, and streams
//! [`IndexEvent`]s back. At most one pass per root is active at a time: a
//! request naming any root that is already being scanned is rejected whole
//! with [`PartSearchError::ScanInProgress`].

mod events;
mod scan;

pub use events::{IndexEvent, ScanOutcome, ScanProgress, ScanReport, SkipCounts};

use crate::cancel::CancellationToken;
use crate::config::IndexerConfig;
use crate::index::IndexStore;
use crate::platform::{canonical_key, DataPaths};
use crate::registry::RootRegistry;
use crate::{PartSearchError, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Options for one index request.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Walk and upsert only: no pruning and no `lastFullScan` stamp.
    pub incremental: bool,
    /// Upserts per committed transaction.
    pub batch_size: usize,
    /// Directory names never descended into.
    pub skip_dir_names: Vec<String>,
    /// Minimum spacing between progress events.
    pub progress_interval: Duration,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            incremental: false,
            batch_size: IndexerConfig::BATCH_SIZE,
            skip_dir_names: IndexerConfig::SKIP_DIR_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            progress_interval: IndexerConfig::PROGRESS_INTERVAL,
        }
    }
}

impl IndexOptions {
    pub fn incremental() -> Self {
        Self {
            incremental: true,
            ..Self::default()
        }
    }
}

/// Handle to a running pass set.
pub struct IndexHandle {
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<IndexEvent>,
    join: JoinHandle<Vec<ScanReport>>,
}

impl IndexHandle {
    /// Request cooperative cancellation. Work already committed is kept.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next event, or `None` once the pass set has finished and every event
    /// has been received.
    pub async fn next_event(&mut self) -> Option<IndexEvent> {
        self.events.recv().await
    }

    /// Wait for the pass set and return one report per root that ran.
    /// Unread events are discarded.
    pub async fn wait(self) -> Result<Vec<ScanReport>> {
        self.join
            .await
            .map_err(|e| PartSearchError::Other(format!("Index worker failed: {}", e)))
    }
}

/// Marks roots as busy for as long as it lives: being scanned, or being
/// removed.
pub(crate) struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    keys: Vec<String>,
}

impl InFlightGuard {
    /// Claim every key or none of them.
    fn claim(in_flight: &Arc<Mutex<HashSet<String>>>, keys: Vec<String>) -> Result<Self> {
        let mut set = in_flight
            .lock()
            .map_err(|_| PartSearchError::Other("Failed to acquire scan lock".to_string()))?;
        if let Some(busy) = keys.iter().find(|k| set.contains(*k)) {
            return Err(PartSearchError::ScanInProgress { root: busy.clone() });
        }
        set.extend(keys.iter().cloned());
        drop(set);

        Ok(Self {
            in_flight: Arc::clone(in_flight),
            keys,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for key in &self.keys {
            set.remove(key);
        }
    }
}

/// Runs index passes and owns the set of roots currently being scanned.
pub struct Indexer {
    paths: DataPaths,
    registry: Arc<RootRegistry>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Indexer {
    pub fn new(paths: DataPaths, registry: Arc<RootRegistry>) -> Self {
        Self {
            paths,
            registry,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether a pass for `root` is running.
    pub fn is_scanning(&self, root: &str) -> bool {
        let key = canonical_key(root);
        self.in_flight
            .lock()
            .map(|set| set.contains(&key))
            .unwrap_or(false)
    }

    /// Hold `root` as busy so no pass can start on it while the guard lives.
    pub(crate) fn reserve(&self, root: &str) -> Result<InFlightGuard> {
        InFlightGuard::claim(&self.in_flight, vec![canonical_key(root)])
    }

    /// Start one pass per root on a blocking worker.
    ///
    /// Roots are identified by the display path stored in the registry.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, roots: Vec<String>, options: IndexOptions) -> Result<IndexHandle> {
        let mut seen = HashSet::new();
        let roots: Vec<String> = roots
            .into_iter()
            .filter(|root| seen.insert(canonical_key(root)))
            .collect();
        let guard = InFlightGuard::claim(&self.in_flight, seen.into_iter().collect())?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let paths = self.paths.clone();
        let registry = Arc::clone(&self.registry);

        let join = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let mut reports = Vec::with_capacity(roots.len());

            for root in &roots {
                if worker_cancel.is_cancelled() {
                    info!(root = %root, "Not started: pass set cancelled");
                    continue;
                }
                match run_root(&paths, &registry, root, &options, &worker_cancel, &tx) {
                    Ok(report) => {
                        let _ = tx.send(IndexEvent::RootDone(report.clone()));
                        reports.push(report);
                    }
                    Err(e) => {
                        error!(root = %root, "Scan failed: {}", e);
                        let _ = tx.send(IndexEvent::Error {
                            root: root.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }

            let _ = tx.send(IndexEvent::AllDone);
            reports
        });

        Ok(IndexHandle {
            cancel,
            events: rx,
            join,
        })
    }
}

/// Scan one root and refresh its registry counters. Counters are written
/// for cancelled passes too, so they reflect what the store now holds.
fn run_root(
    paths: &DataPaths,
    registry: &RootRegistry,
    root: &str,
    options: &IndexOptions,
    cancel: &CancellationToken,
    events: &mpsc::UnboundedSender<IndexEvent>,
) -> Result<ScanReport> {
    let root_path = Path::new(root);
    if !root_path.is_dir() {
        return Err(if root_path.exists() {
            PartSearchError::NotADirectory(root_path.to_path_buf())
        } else {
            PartSearchError::RootNotFound(root_path.to_path_buf())
        });
    }

    let store = IndexStore::open(paths.store_path(root), root)?;
    let report = scan::scan_root(&store, root, options, cancel, events)?;

    let file_count = store.count()?;
    let completed_at = match report.outcome {
        ScanOutcome::Completed { .. } if !report.incremental => store.last_scan_timestamp()?,
        _ => None,
    };
    if let Err(e) = registry.record_scan(root, file_count, report.updated, completed_at) {
        warn!(root, "Failed to update root registry: {}", e);
    }

    Ok(report)
}
