//! Web adapter: crawled URLs to text records.

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use super::{AdapterOutput, RawRecord};
use crate::crawl::PageCache;
use crate::types::RagError;

/// Fetches page bodies and reduces them to whitespace-normalized text.
pub struct WebSource {
    client: Client,
    cache: Option<PageCache>,
}

impl WebSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: None,
        }
    }

    /// Share the crawler's page cache so bodies are fetched once per run.
    #[must_use]
    pub fn with_cache(mut self, cache: PageCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Loads each URL into one record; unreachable or textless pages are
    /// skipped with a warning.
    pub async fn load_pages(&self, urls: &[Url]) -> AdapterOutput {
        let mut output = AdapterOutput::default();

        for url in urls {
            let body = match self.fetch(url).await {
                Ok(body) => body,
                Err(err) => {
                    warn!(url = %url, error = %err, "skipping unreachable page");
                    continue;
                }
            };

            let text = html_to_text(&body);
            if text.is_empty() {
                warn!(url = %url, "page yielded no text");
                continue;
            }

            output.records.push(RawRecord::new(url.as_str(), text));
            output.sources_processed += 1;
        }

        output
    }

    async fn fetch(&self, url: &Url) -> Result<String, RagError> {
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

/// Collapses an HTML body into space-separated visible-ish text.
pub(crate) fn html_to_text(body: &str) -> String {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };

    let mut text = String::new();
    if let Some(body) = document.select(&selector).next() {
        for fragment in body.text() {
            let trimmed = fragment.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
    }
    text
}
