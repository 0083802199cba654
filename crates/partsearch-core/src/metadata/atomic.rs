//! Crash-safe JSON documents.
//!
//! A write lands in `<name>.<uuid>.tmp` beside the target, is synced, and
//! is then renamed over the target. The previous version can be kept as
//! `<name>.bak`. A reader therefore sees either the whole old document or
//! the whole new one.

use crate::{PartSearchError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Load a JSON document. A missing or blank file is `None`; malformed
/// content is [`PartSearchError::Json`].
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let text = match fs::read_to_string(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PartSearchError::io_with_path(e, path)),
        Ok(text) if text.trim().is_empty() => return Ok(None),
        Ok(text) => text,
    };

    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| PartSearchError::Json {
            message: format!("{} is not valid JSON: {}", path.display(), e),
            source: Some(e),
        })
}

/// Replace `path` with the pretty-printed `data`, creating parent
/// directories as needed. With `keep_backup` the replaced version is
/// copied to `<name>.bak` first; failing to do so only logs.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T, keep_backup: bool) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(|e| PartSearchError::io_with_path(e, dir))?;
    }

    let body = serde_json::to_vec_pretty(data)?;
    let staged = sibling(path, &format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    if let Err(e) = stage(&staged, &body) {
        let _ = fs::remove_file(&staged);
        return Err(e);
    }

    if keep_backup && path.is_file() {
        let backup = sibling(path, ".bak");
        match fs::copy(path, &backup) {
            Ok(_) => debug!(backup = %backup.display(), "Kept previous version"),
            Err(e) => warn!("Could not back up {}: {}", path.display(), e),
        }
    }

    if let Err(e) = fs::rename(&staged, path) {
        let _ = fs::remove_file(&staged);
        return Err(PartSearchError::io_with_path(e, path));
    }
    debug!(path = %path.display(), bytes = body.len(), "Replaced document");
    Ok(())
}

/// Write a fresh file and flush it to disk.
fn stage(path: &Path, body: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| PartSearchError::io_with_path(e, path))?;
    file.write_all(body)
        .and_then(|()| file.sync_all())
        .map_err(|e| PartSearchError::io_with_path(e, path))
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
