//! Configuration for chunking, crawling, and retrieval.
//!
//! Every knob has a working default; construct with `Default` and override
//! with the `with_*` methods.

use crate::types::RagError;

/// Controls how raw records are split into chunks.
#[derive(Clone, Debug)]
pub struct ChunkingConfig {
    /// Maximum chunk length, in extended grapheme clusters.
    pub chunk_size: usize,
    /// Shared region between adjacent chunks; must stay below `chunk_size`.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 100,
        }
    }
}

impl ChunkingConfig {
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Rejects degenerate geometry before a chunker is built from it.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidInput(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(RagError::InvalidInput(format!(
                "overlap {} must be smaller than chunk_size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Controls breadth-limited link discovery.
#[derive(Clone, Debug)]
pub struct CrawlConfig {
    /// Number of link-hop levels to explore beyond the seed page.
    pub max_depth: usize,
    /// Restrict discovered links to the seed's origin.
    pub same_origin_only: bool,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            same_origin_only: true,
            user_agent: "answersmith-crawler/0.1".to_string(),
        }
    }
}

impl CrawlConfig {
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    #[must_use]
    pub fn with_same_origin_only(mut self, same_origin_only: bool) -> Self {
        self.same_origin_only = same_origin_only;
        self
    }
}

/// Controls search depth and hybrid fusion.
#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    /// Results returned per question.
    pub top_k: usize,
    /// Reciprocal Rank Fusion constant; higher softens rank differences.
    pub rrf_k: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            rrf_k: 60.0,
        }
    }
}

impl RetrievalConfig {
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub fn with_rrf_k(mut self, rrf_k: f64) -> Self {
        self.rrf_k = rrf_k.max(1.0);
        self
    }
}

/// Aggregate configuration for one ingestion pipeline.
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub crawl: CrawlConfig,
    pub retrieval: RetrievalConfig,
    pub transcription_language: Option<String>,
}

impl PipelineConfig {
    #[must_use]
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    #[must_use]
    pub fn with_crawl(mut self, crawl: CrawlConfig) -> Self {
        self.crawl = crawl;
        self
    }

    #[must_use]
    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    #[must_use]
    pub fn with_transcription_language(mut self, language: impl Into<String>) -> Self {
        self.transcription_language = Some(language.into());
        self
    }

    /// Language hint passed to the transcription capability.
    pub fn transcription_language(&self) -> &str {
        self.transcription_language.as_deref().unwrap_or("en")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_validation_rejects_bad_geometry() {
        assert!(ChunkingConfig::default().validate().is_ok());
        assert!(
            ChunkingConfig::default()
                .with_chunk_size(0)
                .validate()
                .is_err()
        );
        assert!(
            ChunkingConfig::default()
                .with_chunk_size(10)
                .with_overlap(10)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn crawl_depth_never_below_one() {
        let config = CrawlConfig::default().with_max_depth(0);
        assert_eq!(config.max_depth, 1);
    }
}
