//! Progress and result types emitted by index passes.

use serde::Serialize;
use std::path::PathBuf;

/// Why entries were skipped during a walk. Skipped entries still count as
/// scanned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipCounts {
    pub permission_denied: u64,
    /// Listed, then gone before it could be stat'ed.
    pub vanished: u64,
    pub io: u64,
}

impl SkipCounts {
    pub fn total(&self) -> u64 {
        self.permission_denied + self.vanished + self.io
    }

    pub(crate) fn record(&mut self, err: &std::io::Error) {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => self.permission_denied += 1,
            std::io::ErrorKind::NotFound => self.vanished += 1,
            _ => self.io += 1,
        }
    }
}

/// How a root's pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum ScanOutcome {
    /// Ran to the end and finalized. `pruned` is always zero for
    /// incremental passes.
    Completed { pruned: u64 },
    /// Stopped early. Committed rows are kept; nothing was pruned.
    Cancelled,
}

/// Totals for one root's pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub root: String,
    pub generation: i64,
    pub scanned: u64,
    /// Rows inserted or whose stored content changed.
    pub updated: u64,
    pub skipped: SkipCounts,
    pub elapsed_secs: f64,
    pub incremental: bool,
    pub outcome: ScanOutcome,
}

impl ScanReport {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub root: String,
    pub scanned: u64,
    pub updated: u64,
    pub elapsed_secs: f64,
}

/// Events streamed from a running pass set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum IndexEvent {
    RootStarted { root: String, generation: i64 },
    Progress(ScanProgress),
    CurrentPath { root: String, path: PathBuf },
    /// Walk finished; pruning and text index rebuild are running.
    Finalizing { root: String },
    RootDone(ScanReport),
    /// A root failed; the remaining roots still run.
    Error { root: String, message: String },
    AllDone,
}
