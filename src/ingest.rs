//! One-shot ingestion: sources → records → chunks → corpus.
//!
//! A run is all-or-nothing. Individual sources may drop out (logged, and
//! reflected in the processed count), but an embedding or storage failure
//! discards everything the run produced; the caller keeps whatever corpus it
//! had before. Scratch storage is scoped to the run and removed on every
//! exit path.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use crate::chunking::TextChunker;
use crate::config::PipelineConfig;
use crate::crawl::{Crawler, PageCache};
use crate::index::CorpusIndex;
use crate::providers::{EmbeddingProvider, Reranker, TranscriptionProvider};
use crate::scratch::ScratchWorkspace;
use crate::sources::audio::AudioSource;
use crate::sources::files::FileSource;
use crate::sources::web::WebSource;
use crate::sources::AdapterOutput;
use crate::types::RagError;

/// The sources one ingestion run should draw from.
#[derive(Clone, Debug, Default)]
pub struct IngestRequest {
    /// Seed page for the crawl, if any.
    pub seed_url: Option<Url>,
    /// Uploaded files to extract.
    pub files: Vec<PathBuf>,
    /// Media URL to transcribe.
    pub media_url: Option<Url>,
}

impl IngestRequest {
    pub fn is_empty(&self) -> bool {
        self.seed_url.is_none() && self.files.is_empty() && self.media_url.is_none()
    }
}

/// What one ingestion run accomplished.
#[derive(Clone, Copy, Debug, Default)]
pub struct IngestReport {
    /// Sources that contributed at least one record.
    pub sources_processed: usize,
    /// Raw records produced across all adapters.
    pub records: usize,
    /// Chunks embedded and indexed.
    pub chunks_indexed: usize,
}

/// Wires the adapters, chunker, and index together for one corpus build.
pub struct IngestionPipeline {
    client: Client,
    embedder: Arc<dyn EmbeddingProvider>,
    transcriber: Option<Arc<dyn TranscriptionProvider>>,
    reranker: Option<Arc<dyn Reranker>>,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one full ingestion pass and returns the corpus with its report.
    ///
    /// Returns `Err` only for failures that poison the whole build
    /// (embedding or storage); a request whose every source fails still
    /// succeeds, yielding an empty corpus and a zero count.
    pub async fn ingest(
        &self,
        request: IngestRequest,
    ) -> Result<(CorpusIndex, IngestReport), RagError> {
        let scratch = ScratchWorkspace::create()?;
        let chunker = TextChunker::new(self.config.chunking.clone())?;

        let mut gathered = AdapterOutput::default();

        if let Some(seed) = &request.seed_url {
            let cache = PageCache::new(scratch.subdir("pages").await?);
            let crawler = Crawler::new(self.client.clone(), self.config.crawl.clone())
                .with_cache(cache.clone());
            let urls = crawler.crawl(seed).await;
            info!(seed = %seed, discovered = urls.len(), "crawl finished");

            let web = WebSource::new(self.client.clone()).with_cache(cache);
            gathered.merge(web.load_pages(&urls).await);
        }

        if !request.files.is_empty() {
            let files = FileSource::new(&scratch);
            gathered.merge(files.load_files(&request.files).await);
        }

        if let Some(media_url) = &request.media_url {
            match &self.transcriber {
                Some(transcriber) => {
                    let audio = AudioSource::new(
                        self.client.clone(),
                        Arc::clone(transcriber),
                        &scratch,
                        self.config.transcription_language(),
                    );
                    gathered.merge(audio.load_media(media_url).await);
                }
                None => {
                    warn!(url = %media_url, "no transcription capability configured, media source skipped");
                }
            }
        }

        if gathered.records.is_empty() {
            warn!("no data was loaded from any source");
        }

        let chunks = chunker.split_records(&gathered.records);
        let report = IngestReport {
            sources_processed: gathered.sources_processed,
            records: gathered.records.len(),
            chunks_indexed: chunks.len(),
        };

        let corpus = CorpusIndex::build(
            chunks,
            Arc::clone(&self.embedder),
            self.reranker.clone(),
            self.config.retrieval.clone(),
        )
        .await?;

        info!(
            sources = report.sources_processed,
            records = report.records,
            chunks = report.chunks_indexed,
            "ingestion complete"
        );
        Ok((corpus, report))
    }
}

/// Builder for [`IngestionPipeline`].
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    client: Option<Client>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    transcriber: Option<Arc<dyn TranscriptionProvider>>,
    reranker: Option<Arc<dyn Reranker>>,
    config: Option<PipelineConfig>,
}

impl IngestionPipelineBuilder {
    /// Set the embedding capability. Required.
    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn transcriber(mut self, transcriber: Arc<dyn TranscriptionProvider>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    #[must_use]
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// # Panics
    ///
    /// Panics if [`embedder`](Self::embedder) was not called.
    pub fn build(self) -> IngestionPipeline {
        IngestionPipeline {
            client: self.client.unwrap_or_default(),
            embedder: self
                .embedder
                .expect("IngestionPipelineBuilder requires an embedder"),
            transcriber: self.transcriber,
            reranker: self.reranker,
            config: self.config.unwrap_or_default(),
        }
    }

    /// Build the pipeline, returning `None` if no embedder was set.
    pub fn try_build(self) -> Option<IngestionPipeline> {
        Some(IngestionPipeline {
            client: self.client.unwrap_or_default(),
            embedder: self.embedder?,
            transcriber: self.transcriber,
            reranker: self.reranker,
            config: self.config.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmbeddingProvider;

    #[test]
    fn builder_requires_an_embedder() {
        assert!(IngestionPipeline::builder().try_build().is_none());
        assert!(
            IngestionPipeline::builder()
                .embedder(Arc::new(MockEmbeddingProvider::new()))
                .try_build()
                .is_some()
        );
    }

    #[test]
    fn empty_request_is_detectable() {
        assert!(IngestRequest::default().is_empty());
        let request = IngestRequest {
            files: vec![PathBuf::from("notes.txt")],
            ..Default::default()
        };
        assert!(!request.is_empty());
    }

    #[tokio::test]
    async fn ingesting_nothing_yields_an_empty_corpus() {
        let pipeline = IngestionPipeline::builder()
            .embedder(Arc::new(MockEmbeddingProvider::new()))
            .build();
        let (corpus, report) = pipeline.ingest(IngestRequest::default()).await.unwrap();
        assert_eq!(report.sources_processed, 0);
        assert_eq!(report.chunks_indexed, 0);
        assert!(corpus.is_empty().await.unwrap());
    }
}
