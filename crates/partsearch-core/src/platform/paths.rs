//! Data directory layout and canonical path keys.
//!
//! Every place that compares roots or deduplicates hits goes through
//! [`canonical_key`], so `C:\Data\`, `c:/data` and `C:\DATA` all land on the
//! same key.

use crate::config::{AppConfig, PathsConfig};
use crate::error::{PartSearchError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Resolved locations of everything PartSearch persists.
#[derive(Debug, Clone)]
pub struct DataPaths {
    data_dir: PathBuf,
    registry_path: PathBuf,
}

impl DataPaths {
    /// Lay out the data directory rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let registry_path = data_dir.join(AppConfig::REGISTRY_FILE_NAME);
        Self {
            data_dir,
            registry_path,
        }
    }

    /// Use the platform local data directory (`%LOCALAPPDATA%\PartSearch`,
    /// `~/.local/share/PartSearch`, `~/Library/Application Support/PartSearch`).
    pub fn platform_default() -> Result<Self> {
        let base = dirs::data_local_dir().ok_or_else(|| PartSearchError::Config {
            message: "Could not determine local data directory".to_string(),
        })?;
        Ok(Self::new(base.join(AppConfig::APP_NAME)))
    }

    /// Place the registry document somewhere other than the data directory.
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = path.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// Directory holding one sub-directory per indexed root.
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join(PathsConfig::INDEX_DIR_NAME)
    }

    /// Store file for a root, whether or not it exists yet.
    pub fn store_path(&self, root: &str) -> PathBuf {
        store_dir_for_root(&self.index_dir(), root).join(PathsConfig::STORE_FILE_NAME)
    }

    /// Every store file currently present under the index directory.
    pub fn existing_stores(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(self.index_dir()) else {
            return Vec::new();
        };
        let mut stores: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().join(PathsConfig::STORE_FILE_NAME))
            .filter(|path| path.is_file())
            .collect();
        stores.sort();
        stores
    }
}

/// Directory for a root's store: the first hex characters of the SHA-256 of
/// its canonical key.
pub fn store_dir_for_root(index_dir: &Path, root: &str) -> PathBuf {
    let digest = Sha256::digest(canonical_key(root).as_bytes());
    let name = hex::encode(digest);
    index_dir.join(&name[..PathsConfig::STORE_DIR_HASH_LEN])
}

/// Trimmed display form of a path, separators left as the user typed them.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().trim().to_string()
}

/// Case-folded, separator-normalized lookup key for a path.
///
/// Backslashes become `/`, repeated separators collapse, `.` segments drop,
/// `..` resolves lexically, trailing separators are stripped and the result
/// is lower-cased. Drive roots keep their separator (`c:/`) so `C:` and
/// `C:\` agree; UNC prefixes keep their leading `//`.
pub fn canonical_key(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let unified = trimmed.replace('\\', "/");

    let (prefix, rest) = if let Some(rest) = unified.strip_prefix("//") {
        ("//", rest)
    } else if let Some(rest) = unified.strip_prefix('/') {
        ("/", rest)
    } else {
        ("", unified.as_str())
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                let can_pop = segments
                    .last()
                    .is_some_and(|last| *last != ".." && !is_drive(last));
                if can_pop {
                    segments.pop();
                } else if prefix.is_empty() && segments.last().map_or(true, |last| *last == "..") {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut key = String::with_capacity(unified.len());
    key.push_str(prefix);
    key.push_str(&segments.join("/"));
    if prefix.is_empty() && segments.len() == 1 && is_drive(segments[0]) {
        key.push('/');
    }
    if key.is_empty() {
        key.push('/');
    }
    key.to_lowercase()
}

fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
