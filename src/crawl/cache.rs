//! Scratch-backed cache for fetched pages.
//!
//! The crawler fetches every page it expands; the web adapter needs the same
//! bodies again when it turns URLs into records. Caching under the run's
//! scratch directory keeps each page to a single network round trip without
//! letting anything leak across runs.

use std::path::{Path, PathBuf};

use tokio::fs;
use url::Url;

use crate::types::RagError;

/// Filesystem cache keyed by sanitized URL, rooted in scratch storage.
#[derive(Clone, Debug)]
pub struct PageCache {
    root: PathBuf,
}

impl PageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic cache file path for a URL.
    pub fn cache_path(&self, url: &Url) -> PathBuf {
        let mut components: Vec<String> = url
            .path()
            .trim_start_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(sanitize_component)
            .collect();

        if components.is_empty() {
            components.push("index".to_string());
        }

        let mut file_name = sanitize_component(url.host_str().unwrap_or("page"));
        file_name.push('_');
        file_name.push_str(&components.join("_"));

        if let Some(query) = url.query() {
            file_name.push('_');
            file_name.push_str(&sanitize_component(query));
        }

        file_name.push_str(".html");
        self.root.join(file_name)
    }

    pub async fn get(&self, url: &Url) -> Option<String> {
        let path = self.cache_path(url);
        fs::read_to_string(&path).await.ok()
    }

    pub async fn put(&self, url: &Url, body: &str) -> Result<(), RagError> {
        let path = self.cache_path(url);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, body).await?;
        Ok(())
    }
}

fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cache_path_sanitizes_segments() {
        let cache = PageCache::new("tmp");
        let url = Url::parse("https://example.com/foo/bar?page=1&lang=en").unwrap();
        let path = cache.cache_path(&url);
        assert!(path.ends_with("example.com_foo_bar_page_1_lang_en.html"));
    }

    #[tokio::test]
    async fn round_trip_through_cache() {
        let dir = tempdir().unwrap();
        let cache = PageCache::new(dir.path());
        let url = Url::parse("https://example.com/cached").unwrap();

        assert!(cache.get(&url).await.is_none());
        cache.put(&url, "<html>cached</html>").await.unwrap();
        assert_eq!(cache.get(&url).await.as_deref(), Some("<html>cached</html>"));
    }
}
