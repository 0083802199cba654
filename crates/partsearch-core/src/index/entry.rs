//! Rows of the per-root `files` table.

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// One file or directory known to a root's index store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// The root this entry was found under, as stored in the registry.
    pub root: String,
    /// Full path of the entry.
    pub path: String,
    pub name: String,
    /// Lower-cased extension without the dot; empty for directories.
    pub ext: String,
    /// Size in bytes; `None` for directories.
    pub size: Option<u64>,
    /// Modification time, epoch seconds.
    pub modified: Option<f64>,
    /// Creation time, epoch seconds, where the platform reports it.
    pub created: Option<f64>,
    pub is_dir: bool,
    pub parent: Option<String>,
    /// Pass that last saw this entry. Only set on rows read back from a store.
    #[serde(default)]
    pub scan_generation: Option<i64>,
}

impl FileEntry {
    /// Build an entry from a walked path and its metadata.
    pub fn from_metadata(root: &str, path: &Path, metadata: &Metadata) -> Self {
        let is_dir = metadata.is_dir();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let ext = if is_dir {
            String::new()
        } else {
            path.extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default()
        };

        Self {
            root: root.to_string(),
            path: path.to_string_lossy().to_string(),
            name,
            ext,
            size: if is_dir { None } else { Some(metadata.len()) },
            modified: metadata.modified().ok().and_then(epoch_seconds),
            created: metadata.created().ok().and_then(epoch_seconds),
            is_dir,
            parent: path.parent().map(|p| p.to_string_lossy().to_string()),
            scan_generation: None,
        }
    }
}

/// Seconds since the Unix epoch as a float, or `None` before the epoch.
pub fn epoch_seconds(time: SystemTime) -> Option<f64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs_f64())
}
