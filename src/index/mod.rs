//! The session corpus: embedded chunks plus vector, lexical, and hybrid
//! search over them.
//!
//! Hybrid retrieval fuses the pure-vector and pure-lexical top-k lists with
//! Reciprocal Rank Fusion, so a fused result can only ever be a candidate
//! one of the two underlying searches already surfaced. An optional
//! [`Reranker`] reorders the fused candidates before truncation; when it is
//! absent or fails, the fused order stands.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::chunking::Chunk;
use crate::config::RetrievalConfig;
use crate::providers::{EmbeddingProvider, Reranker};
use crate::stores::{ChunkRow, ScoredChunk, SqliteCorpusStore};
use crate::types::RagError;

/// Maximum chunks embedded per provider call.
const EMBED_BATCH_SIZE: usize = 64;

/// Retrieval strategy for [`CorpusIndex::search`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    Vector,
    Lexical,
    Hybrid,
}

/// An embedded, searchable corpus for one session.
///
/// Built once per ingestion run and queried read-only afterwards; replacing
/// a session's corpus means building a new `CorpusIndex` wholesale.
pub struct CorpusIndex {
    store: SqliteCorpusStore,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn Reranker>>,
    retrieval: RetrievalConfig,
}

impl CorpusIndex {
    /// Embeds `chunks` and builds an in-memory corpus from them.
    ///
    /// Any embedding failure aborts the build; there is no partially-built
    /// corpus. An empty chunk list builds an empty (searchable) corpus.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Option<Arc<dyn Reranker>>,
        retrieval: RetrievalConfig,
    ) -> Result<Self, RagError> {
        let store = SqliteCorpusStore::open_in_memory(embedder.ndims()).await?;
        Self::populate(store, chunks, embedder, reranker, retrieval).await
    }

    /// Like [`build`](Self::build), but file-backed (e.g. under scratch
    /// storage) rather than in memory.
    pub async fn build_at(
        path: impl AsRef<Path>,
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Option<Arc<dyn Reranker>>,
        retrieval: RetrievalConfig,
    ) -> Result<Self, RagError> {
        let store = SqliteCorpusStore::open(path, embedder.ndims()).await?;
        Self::populate(store, chunks, embedder, reranker, retrieval).await
    }

    async fn populate(
        store: SqliteCorpusStore,
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Option<Arc<dyn Reranker>>,
        retrieval: RetrievalConfig,
    ) -> Result<Self, RagError> {
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "provider returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            let rows: Vec<(ChunkRow, Vec<f32>)> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| {
                    (
                        ChunkRow::new(
                            Uuid::new_v4().to_string(),
                            chunk.source_id.clone(),
                            chunk.sequence_index,
                            chunk.text.clone(),
                        ),
                        vector,
                    )
                })
                .collect();
            store.insert_chunks(rows).await?;
        }

        Ok(Self {
            store,
            embedder,
            reranker,
            retrieval,
        })
    }

    /// Number of indexed chunks.
    pub async fn len(&self) -> Result<usize, RagError> {
        self.store.count().await
    }

    pub async fn is_empty(&self) -> Result<bool, RagError> {
        Ok(self.len().await? == 0)
    }

    /// Fusion constant currently in effect.
    pub fn retrieval_config(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    /// Returns the `k` most relevant chunks for `query`, best first.
    ///
    /// An empty corpus yields an empty result for every query and mode.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        mode: SearchMode,
    ) -> Result<Vec<Chunk>, RagError> {
        if k == 0 || self.store.count().await? == 0 {
            return Ok(Vec::new());
        }

        let hits = match mode {
            SearchMode::Vector => self.search_vector(query, k).await?,
            SearchMode::Lexical => self.store.search_lexical(query, k).await?,
            SearchMode::Hybrid => self.search_hybrid(query, k).await?,
        };

        Ok(hits
            .into_iter()
            .map(|hit| Chunk {
                text: hit.row.content,
                source_id: hit.row.source_id,
                sequence_index: hit.row.chunk_index,
            })
            .collect())
    }

    async fn search_vector(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        let query_embedding = self.embedder.embed_one(query).await?;
        self.store.search_vector(&query_embedding, k).await
    }

    async fn search_hybrid(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        let vector_hits = self.search_vector(query, k).await?;
        let lexical_hits = self.store.search_lexical(query, k).await?;

        let mut fused = fuse_candidates(vector_hits, lexical_hits, self.retrieval.rrf_k);

        if let Some(reranker) = &self.reranker {
            let documents: Vec<String> = fused
                .iter()
                .map(|candidate| candidate.row.content.clone())
                .collect();
            match reranker.rerank(query, &documents).await {
                Ok(scores) if scores.len() == fused.len() => {
                    let mut rescored: Vec<(f32, ScoredChunk)> =
                        scores.into_iter().zip(fused).collect();
                    rescored.sort_by(|a, b| {
                        b.0.partial_cmp(&a.0)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(a.1.row.rowid.cmp(&b.1.row.rowid))
                    });
                    fused = rescored.into_iter().map(|(_, hit)| hit).collect();
                }
                Ok(scores) => {
                    warn!(
                        expected = fused.len(),
                        got = scores.len(),
                        "reranker returned wrong score count, keeping fused order"
                    );
                }
                Err(err) => {
                    warn!(error = %err, "reranker unavailable, keeping fused order");
                }
            }
        }

        fused.truncate(k);
        debug!(results = fused.len(), "hybrid search complete");
        Ok(fused)
    }
}

/// Reciprocal Rank Fusion over the two candidate lists.
///
/// Every candidate keeps the better of its per-list scores for reporting;
/// ordering comes from the summed `1 / (rrf_k + rank)` contributions, with
/// rowid (insertion order) as the tie-break.
fn fuse_candidates(
    vector_hits: Vec<ScoredChunk>,
    lexical_hits: Vec<ScoredChunk>,
    rrf_k: f64,
) -> Vec<ScoredChunk> {
    let rrf_k = rrf_k.max(1.0);
    let mut by_rowid: HashMap<i64, (f64, ScoredChunk)> = HashMap::new();

    for (rank, hit) in vector_hits
        .into_iter()
        .enumerate()
        .chain(lexical_hits.into_iter().enumerate())
    {
        let contribution = rrf_contribution(rrf_k, rank + 1);
        let hit_score = hit.score;
        by_rowid
            .entry(hit.row.rowid)
            .and_modify(|(score, existing)| {
                *score += contribution;
                existing.score = existing.score.max(hit_score);
            })
            .or_insert((contribution, hit));
    }

    let mut fused: Vec<(f64, ScoredChunk)> = by_rowid.into_values().collect();
    fused.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.row.rowid.cmp(&b.1.row.rowid))
    });
    fused.into_iter().map(|(_, hit)| hit).collect()
}

fn rrf_contribution(rrf_k: f64, rank: usize) -> f64 {
    1.0 / (rrf_k + rank as f64)
}
