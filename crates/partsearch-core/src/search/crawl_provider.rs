//! Live walk of directories on disk.

use super::{Provider, ProviderOutput, ProviderRequest, SearchHit, SourceTag};
use crate::config::IndexerConfig;
use crate::index::epoch_seconds;
use crate::Result;
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

/// Walks the allowed roots, or its default roots when none are given, and
/// matches every entry in memory. Stops walking once `limit` hits are found,
/// then orders them most recently modified first.
#[derive(Debug, Clone)]
pub struct CrawlProvider {
    default_roots: Vec<PathBuf>,
    skip_dir_names: Vec<String>,
}

impl CrawlProvider {
    pub fn new(default_roots: Vec<PathBuf>) -> Self {
        Self {
            default_roots,
            skip_dir_names: IndexerConfig::SKIP_DIR_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    fn is_skipped(&self, name: &str) -> bool {
        self.skip_dir_names
            .iter()
            .any(|skip| skip.eq_ignore_ascii_case(name))
    }
}

impl Provider for CrawlProvider {
    fn source(&self) -> SourceTag {
        SourceTag::Crawl
    }

    fn search(&self, request: &ProviderRequest<'_>) -> Result<ProviderOutput> {
        let matcher = request.query.matcher()?;
        let roots = if request.allowed_roots.is_empty() {
            &self.default_roots
        } else {
            request.allowed_roots
        };

        let mut hits = Vec::new();
        'roots: for root in roots {
            let walker = WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|entry| {
                    entry.depth() == 0
                        || !entry.file_type().is_dir()
                        || !self.is_skipped(&entry.file_name().to_string_lossy())
                });

            for item in walker {
                request.cancel.check()?;
                if hits.len() >= request.limit {
                    break 'roots;
                }
                let Ok(entry) = item else {
                    continue;
                };
                let name = entry.file_name().to_string_lossy();
                let path = entry.path().to_string_lossy();
                if !matcher.matches(&name, &path) {
                    continue;
                }
                let Ok(metadata) = entry.metadata() else {
                    continue;
                };
                hits.push(SearchHit::new(
                    path.to_string(),
                    metadata.is_dir(),
                    Some(metadata.len()),
                    metadata.modified().ok().and_then(epoch_seconds),
                    SourceTag::Crawl,
                ));
            }
        }

        hits.sort_by(|a, b| {
            b.modified
                .partial_cmp(&a.modified)
                .unwrap_or(Ordering::Equal)
        });
        debug!(roots = roots.len(), hits = hits.len(), "Crawl finished");
        Ok(hits.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::query::ParsedQuery;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn crawl(provider: &CrawlProvider, query: &str, roots: &[PathBuf], limit: usize) -> Vec<String> {
        let query = ParsedQuery::parse(query, false);
        let cancel = CancellationToken::new();
        provider
            .search(&ProviderRequest {
                query: &query,
                allowed_roots: roots,
                limit,
                cancel: &cancel,
            })
            .unwrap()
            .hits
            .into_iter()
            .map(|hit| hit.name)
            .collect()
    }

    fn tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::create_dir_all(root.join("node_modules")).unwrap();
        std::fs::write(root.join("motorhousing.sldprt"), b"a").unwrap();
        std::fs::write(root.join("housingmotor.pdf"), b"b").unwrap();
        std::fs::write(root.join("sub/motor_mount.step"), b"c").unwrap();
        std::fs::write(root.join("node_modules/motor.js"), b"d").unwrap();
        temp
    }

    #[test]
    fn test_glob_is_anchored_and_deny_list_skipped() {
        let temp = tree();
        let provider = CrawlProvider::new(Vec::new());

        let mut names = crawl(&provider, "motor*", &[temp.path().to_path_buf()], 100);
        names.sort();

        assert_eq!(names, vec!["motor_mount.step", "motorhousing.sldprt"]);
    }

    #[test]
    fn test_default_roots_used_without_scope() {
        let temp = tree();
        let provider = CrawlProvider::new(vec![temp.path().to_path_buf()]);

        let names = crawl(&provider, "housingmotor", &[], 100);
        assert_eq!(names, vec!["housingmotor.pdf"]);
    }

    #[test]
    fn test_newest_first_and_limit() {
        let temp = TempDir::new().unwrap();
        let now = SystemTime::now();
        for (name, age) in [("old.pdf", 300), ("new.pdf", 0), ("mid.pdf", 100)] {
            let path = temp.path().join(name);
            let file = std::fs::File::create(&path).unwrap();
            file.set_modified(now - Duration::from_secs(age)).unwrap();
        }
        let provider = CrawlProvider::new(Vec::new());

        let names = crawl(&provider, "pdf", &[temp.path().to_path_buf()], 100);
        assert_eq!(names, vec!["new.pdf", "mid.pdf", "old.pdf"]);

        let capped = crawl(&provider, "pdf", &[temp.path().to_path_buf()], 2);
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_cancelled_crawl_reports_cancellation() {
        let temp = tree();
        let provider = CrawlProvider::new(Vec::new());
        let query = ParsedQuery::parse("motor", false);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = provider.search(&ProviderRequest {
            query: &query,
            allowed_roots: &[temp.path().to_path_buf()],
            limit: 100,
            cancel: &cancel,
        });

        assert!(matches!(result, Err(crate::PartSearchError::Cancelled)));
    }
}
