//! Discovery of useful starting directories.
//!
//! Used to suggest roots to register and as the live crawl's default roots
//! when a search names none.

use super::paths::canonical_key;
use std::collections::HashSet;
use std::path::PathBuf;

/// Home directory, OneDrive/SharePoint sync folders and, on Windows, the
/// fixed drive letters. Deduplicated by canonical key, order preserved.
pub fn candidate_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Some(home) = dirs::home_dir() {
        roots.push(home.clone());

        if let Some(one_drive) = std::env::var_os("OneDrive") {
            roots.push(PathBuf::from(one_drive));
        }

        if let Ok(entries) = std::fs::read_dir(&home) {
            let mut synced: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| {
                    let name = entry.file_name().to_string_lossy().to_string();
                    name.starts_with("OneDrive") || name.contains("SharePoint")
                })
                .map(|entry| entry.path())
                .collect();
            synced.sort();
            roots.extend(synced);
        }
    }

    roots.extend(drive_roots());
    dedup_existing_dirs(roots)
}

#[cfg(windows)]
fn drive_roots() -> Vec<PathBuf> {
    (b'C'..=b'Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
        .filter(|drive| drive.is_dir())
        .collect()
}

#[cfg(not(windows))]
fn drive_roots() -> Vec<PathBuf> {
    Vec::new()
}

fn dedup_existing_dirs(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    roots
        .into_iter()
        .filter(|root| root.is_dir())
        .filter(|root| seen.insert(canonical_key(&root.to_string_lossy())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_drops_duplicates_and_missing_dirs() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let with_slash = PathBuf::from(format!("{}/", dir.display()));
        let missing = dir.join("does-not-exist");

        let roots = dedup_existing_dirs(vec![dir.clone(), with_slash, missing]);
        assert_eq!(roots, vec![dir]);
    }

    #[test]
    fn test_candidate_roots_are_directories() {
        for root in candidate_roots() {
            assert!(root.is_dir(), "{} is not a directory", root.display());
        }
    }
}
