//! One blocking scan pass over a single root.

use super::events::{IndexEvent, ScanOutcome, ScanProgress, ScanReport, SkipCounts};
use super::IndexOptions;
use crate::cancel::CancellationToken;
use crate::index::{FileEntry, IndexStore};
use crate::{PartSearchError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Walk `root`, upsert every entry into `store`, then finalize unless the
/// pass was cancelled.
///
/// Batches are committed as they fill, so cancelling keeps everything seen
/// so far. Pruning runs only after a full, uncancelled walk.
pub(crate) fn scan_root(
    store: &IndexStore,
    root: &str,
    options: &IndexOptions,
    cancel: &CancellationToken,
    events: &UnboundedSender<IndexEvent>,
) -> Result<ScanReport> {
    let root_path = Path::new(root);
    if !root_path.exists() {
        return Err(PartSearchError::RootNotFound(root_path.to_path_buf()));
    }
    if !root_path.is_dir() {
        return Err(PartSearchError::NotADirectory(root_path.to_path_buf()));
    }

    let generation = store.next_generation()?;
    let _ = events.send(IndexEvent::RootStarted {
        root: root.to_string(),
        generation,
    });
    info!(root, generation, incremental = options.incremental, "Starting scan");

    let start = Instant::now();
    let mut pass = PassState::new(root, generation, start);
    let mut batch: Vec<FileEntry> = Vec::with_capacity(options.batch_size);
    let mut cancelled = false;

    let walker = WalkDir::new(root_path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry, &options.skip_dir_names));

    for item in walker {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        pass.scanned += 1;

        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                match err.io_error() {
                    Some(io) => pass.skipped.record(io),
                    None => pass.skipped.io += 1,
                }
                debug!("Skipping unreadable entry: {}", err);
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                match err.io_error() {
                    Some(io) => pass.skipped.record(io),
                    None => pass.skipped.io += 1,
                }
                debug!("Skipping {}: {}", entry.path().display(), err);
                continue;
            }
        };

        if metadata.is_dir() {
            pass.current_dir = Some(entry.path().to_path_buf());
        }
        batch.push(FileEntry::from_metadata(root, entry.path(), &metadata));

        if batch.len() >= options.batch_size {
            pass.commit(store, &mut batch)?;
            pass.maybe_report(events, options);
        }
    }

    pass.commit(store, &mut batch)?;

    if cancelled {
        let report = pass.report(options, ScanOutcome::Cancelled);
        info!(
            root,
            scanned = report.scanned,
            updated = report.updated,
            "Scan cancelled; finalization skipped"
        );
        return Ok(report);
    }

    let _ = events.send(IndexEvent::Finalizing {
        root: root.to_string(),
    });

    let pruned = if options.incremental {
        0
    } else {
        store.prune_older_than(generation)? as u64
    };

    if let Err(e) = store.rebuild_text_index() {
        warn!(root, "Text index rebuild failed: {}", e);
    }

    if !options.incremental {
        store.set_last_scan_timestamp(Utc::now())?;
    }

    if let Err(e) = store.checkpoint_wal() {
        debug!(root, "WAL checkpoint skipped: {}", e);
    }

    let report = pass.report(options, ScanOutcome::Completed { pruned });
    info!(
        root,
        scanned = report.scanned,
        updated = report.updated,
        pruned,
        skipped = report.skipped.total(),
        elapsed_secs = report.elapsed_secs,
        "Scan complete"
    );
    Ok(report)
}

/// Deny-listed directory names are skipped below the root, case-insensitively.
fn is_skipped_dir(entry: &DirEntry, skip_dir_names: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    skip_dir_names
        .iter()
        .any(|skip| skip.eq_ignore_ascii_case(&name))
}

struct PassState {
    root: String,
    generation: i64,
    start: Instant,
    scanned: u64,
    updated: u64,
    skipped: SkipCounts,
    current_dir: Option<PathBuf>,
    last_report: Option<Instant>,
}

impl PassState {
    fn new(root: &str, generation: i64, start: Instant) -> Self {
        Self {
            root: root.to_string(),
            generation,
            start,
            scanned: 0,
            updated: 0,
            skipped: SkipCounts::default(),
            current_dir: None,
            last_report: None,
        }
    }

    fn commit(&mut self, store: &IndexStore, batch: &mut Vec<FileEntry>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let outcome = store.upsert_batch(batch, self.generation)?;
        self.updated += outcome.changed();
        batch.clear();
        Ok(())
    }

    /// Emit progress at most once per configured interval.
    fn maybe_report(&mut self, events: &UnboundedSender<IndexEvent>, options: &IndexOptions) {
        let due = self
            .last_report
            .map_or(true, |at| at.elapsed() >= options.progress_interval);
        if !due {
            return;
        }
        self.last_report = Some(Instant::now());

        let _ = events.send(IndexEvent::Progress(ScanProgress {
            root: self.root.clone(),
            scanned: self.scanned,
            updated: self.updated,
            elapsed_secs: self.start.elapsed().as_secs_f64(),
        }));
        if let Some(path) = &self.current_dir {
            let _ = events.send(IndexEvent::CurrentPath {
                root: self.root.clone(),
                path: path.clone(),
            });
        }
    }

    fn report(&self, options: &IndexOptions, outcome: ScanOutcome) -> ScanReport {
        ScanReport {
            root: self.root.clone(),
            generation: self.generation,
            scanned: self.scanned,
            updated: self.updated,
            skipped: self.skipped,
            elapsed_secs: self.start.elapsed().as_secs_f64(),
            incremental: options.incremental,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn build_tree(root: &Path) {
        std::fs::create_dir_all(root.join("sub/deeper")).unwrap();
        std::fs::create_dir_all(root.join(".git/objects")).unwrap();
        std::fs::write(root.join("A.sldprt"), b"a").unwrap();
        std::fs::write(root.join("B.pdf"), b"b").unwrap();
        std::fs::write(root.join("sub/A.sldprt"), b"a").unwrap();
        std::fs::write(root.join("sub/deeper/C.step"), b"c").unwrap();
        std::fs::write(root.join(".git/objects/blob"), b"x").unwrap();
    }

    fn setup() -> (TempDir, String, IndexStore) {
        let temp = TempDir::new().unwrap();
        let root_dir = temp.path().join("R");
        build_tree(&root_dir);
        let root = root_dir.to_string_lossy().to_string();
        let store = IndexStore::open(temp.path().join("store/index_db.sqlite"), &root).unwrap();
        (temp, root, store)
    }

    fn options() -> IndexOptions {
        IndexOptions {
            batch_size: 2,
            ..IndexOptions::default()
        }
    }

    #[test]
    fn test_scan_counts_and_skips_deny_list() {
        let (_temp, root, store) = setup();
        let (tx, _rx) = mpsc::unbounded_channel();

        let report = scan_root(&store, &root, &options(), &CancellationToken::new(), &tx).unwrap();

        // R, A.sldprt, B.pdf, sub, sub/A.sldprt, sub/deeper, sub/deeper/C.step
        assert_eq!(report.scanned, 7);
        assert_eq!(report.updated, 7);
        assert_eq!(report.outcome, ScanOutcome::Completed { pruned: 0 });
        assert_eq!(store.count().unwrap(), 7);
        assert!(store.last_scan_timestamp().unwrap().is_some());
    }

    #[test]
    fn test_rescan_unchanged_tree_reports_no_updates() {
        let (_temp, root, store) = setup();
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        scan_root(&store, &root, &options(), &cancel, &tx).unwrap();
        let second = scan_root(&store, &root, &options(), &cancel, &tx).unwrap();

        assert_eq!(second.scanned, 7);
        assert_eq!(second.updated, 0);
        assert_eq!(store.count().unwrap(), 7);
    }

    #[test]
    fn test_deleted_file_is_pruned() {
        let (_temp, root, store) = setup();
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        scan_root(&store, &root, &options(), &cancel, &tx).unwrap();
        std::fs::remove_file(Path::new(&root).join("sub/A.sldprt")).unwrap();
        let report = scan_root(&store, &root, &options(), &cancel, &tx).unwrap();

        assert_eq!(report.scanned, 6);
        assert_eq!(report.outcome, ScanOutcome::Completed { pruned: 1 });
        assert_eq!(store.count().unwrap(), 6);
    }

    #[test]
    fn test_cancelled_scan_keeps_rows_and_skips_finalization() {
        let (_temp, root, store) = setup();
        let (tx, _rx) = mpsc::unbounded_channel();

        scan_root(&store, &root, &options(), &CancellationToken::new(), &tx).unwrap();
        let stamped = store.last_scan_timestamp().unwrap();
        std::fs::remove_file(Path::new(&root).join("B.pdf")).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = scan_root(&store, &root, &options(), &cancel, &tx).unwrap();

        assert!(report.is_cancelled());
        assert_eq!(store.count().unwrap(), 7);
        assert_eq!(store.last_scan_timestamp().unwrap(), stamped);
    }

    #[test]
    fn test_incremental_scan_does_not_prune() {
        let (_temp, root, store) = setup();
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        scan_root(&store, &root, &options(), &cancel, &tx).unwrap();
        std::fs::remove_file(Path::new(&root).join("B.pdf")).unwrap();
        let incremental = IndexOptions {
            incremental: true,
            ..options()
        };
        let report = scan_root(&store, &root, &incremental, &cancel, &tx).unwrap();

        assert_eq!(report.outcome, ScanOutcome::Completed { pruned: 0 });
        assert_eq!(store.count().unwrap(), 7);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope").to_string_lossy().to_string();
        let store = IndexStore::open(temp.path().join("s.sqlite"), &missing).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = scan_root(&store, &missing, &options(), &CancellationToken::new(), &tx)
            .unwrap_err();
        assert!(matches!(err, PartSearchError::RootNotFound(_)));
    }

    #[test]
    fn test_emits_start_progress_and_finalizing() {
        let (_temp, root, store) = setup();
        let (tx, mut rx) = mpsc::unbounded_channel();

        scan_root(&store, &root, &options(), &CancellationToken::new(), &tx).unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(IndexEvent::RootStarted { .. })));
        assert!(events.iter().any(|e| matches!(e, IndexEvent::Progress(_))));
        assert!(matches!(events.last(), Some(IndexEvent::Finalizing { .. })));
    }
}
