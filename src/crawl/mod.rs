//! Breadth-limited link discovery from a seed URL.
//!
//! Depth 0 is the seed page itself. Each level up to the configured depth
//! fetches the URLs discovered at the previous level and extracts further
//! links; URLs are deduplicated by their normalized (fragment-stripped) form
//! and returned in discovery order so downstream processing is reproducible.

pub mod cache;

use std::collections::HashSet;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use crate::config::CrawlConfig;
use crate::types::RagError;

pub use cache::PageCache;

/// Breadth-first crawler bounded by [`CrawlConfig::max_depth`].
pub struct Crawler {
    client: Client,
    config: CrawlConfig,
    cache: Option<PageCache>,
}

impl Crawler {
    pub fn new(client: Client, config: CrawlConfig) -> Self {
        Self {
            client,
            config,
            cache: None,
        }
    }

    /// Reuse fetched page bodies through a scratch-backed cache.
    #[must_use]
    pub fn with_cache(mut self, cache: PageCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Discovers every URL reachable from `seed` within the depth bound.
    ///
    /// The result includes the seed and is insertion-ordered. A page that
    /// cannot be fetched is skipped with a warning; an unreachable seed
    /// yields an empty result rather than an error, which callers treat as
    /// zero sources to process.
    pub async fn crawl(&self, seed: &Url) -> Vec<Url> {
        let seed = normalize_url(seed.clone());
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(seed.as_str().to_string());

        let mut discovered = vec![seed.clone()];
        // Frontier of pages to expand at the current level.
        let mut frontier = vec![seed.clone()];

        for depth in 0..self.config.max_depth {
            let mut next_level = Vec::new();

            for url in &frontier {
                let body = match self.fetch_page(url).await {
                    Ok(body) => body,
                    Err(err) => {
                        if depth == 0 && *url == seed {
                            warn!(url = %url, error = %err, "seed page unreachable, aborting crawl");
                            return Vec::new();
                        }
                        warn!(url = %url, error = %err, "skipping unreachable page");
                        continue;
                    }
                };

                for link in extract_links(&body, url) {
                    if self.config.same_origin_only && !same_origin(&link, &seed) {
                        continue;
                    }
                    if seen.insert(link.as_str().to_string()) {
                        discovered.push(link.clone());
                        next_level.push(link);
                    }
                }
            }

            if next_level.is_empty() {
                break;
            }
            frontier = next_level;
        }

        discovered
    }

    /// Fetches one page, consulting the cache first when one is attached.
    pub async fn fetch_page(&self, url: &Url) -> Result<String, RagError> {
        if let Some(cache) = &self.cache {
            if let Some(body) = cache.get(url).await {
                return Ok(body);
            }
        }

        let body = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if let Some(cache) = &self.cache {
            cache.put(url, &body).await?;
        }
        Ok(body)
    }
}

/// Strips the fragment so equivalent URLs dedup to one visit.
pub(crate) fn normalize_url(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

fn same_origin(url: &Url, reference: &Url) -> bool {
    url.scheme() == reference.scheme()
        && url.host_str() == reference.host_str()
        && url.port_or_known_default() == reference.port_or_known_default()
}

/// Extracts absolute, fragment-free hyperlinks from an HTML body.
pub(crate) fn extract_links(body: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') {
            continue;
        }
        if let Ok(url) = base.join(href) {
            let url = normalize_url(url);
            if !matches!(url.scheme(), "http" | "https") {
                continue;
            }
            if !links.contains(&url) {
                links.push(url);
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_fragments() {
        let url = Url::parse("https://example.com/page#section").unwrap();
        assert_eq!(normalize_url(url).as_str(), "https://example.com/page");
    }

    #[test]
    fn links_are_resolved_and_deduplicated() {
        let base = Url::parse("https://example.com/docs/").unwrap();
        let body = r##"
            <html><body>
              <a href="intro.html">Intro</a>
              <a href="/docs/intro.html">Intro again</a>
              <a href="intro.html#anchor">Intro anchor</a>
              <a href="#top">Top</a>
              <a href="mailto:someone@example.com">Mail</a>
              <a href="https://other.org/page">Elsewhere</a>
            </body></html>
        "##;

        let links = extract_links(body, &base);
        assert_eq!(
            links,
            vec![
                Url::parse("https://example.com/docs/intro.html").unwrap(),
                Url::parse("https://other.org/page").unwrap(),
            ]
        );
    }

    #[test]
    fn origin_comparison_covers_scheme_host_port() {
        let a = Url::parse("https://example.com/x").unwrap();
        let b = Url::parse("https://example.com:443/y").unwrap();
        let c = Url::parse("http://example.com/z").unwrap();
        assert!(same_origin(&a, &b));
        assert!(!same_origin(&a, &c));
    }
}
