//! Corpus storage: chunk rows plus their embedding and full-text indexes.
//!
//! ```text
//!          ┌────────────────────────┐
//!          │   SqliteCorpusStore    │
//!          │  (one per ingestion)   │
//!          └───────────┬────────────┘
//!                      │
//!        ┌─────────────┼──────────────┐
//!        ▼             ▼              ▼
//!     chunks     chunk_embeddings  chunk_fts
//!   (rowid, id,   (vec0 float[d])  (FTS5 body)
//!    source, text)
//! ```
//!
//! The three tables share rowids, so vector and lexical hits resolve to the
//! same chunk row and rowid order doubles as the stable tie-break.

pub mod sqlite;

use serde::{Deserialize, Serialize};

pub use sqlite::SqliteCorpusStore;

/// One stored chunk, as read back from the corpus store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRow {
    /// Insertion-ordered storage id; 0 until the row has been persisted.
    pub rowid: i64,
    pub id: String,
    pub source_id: String,
    pub chunk_index: usize,
    pub content: String,
}

impl ChunkRow {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        chunk_index: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            rowid: 0,
            id: id.into(),
            source_id: source_id.into(),
            chunk_index,
            content: content.into(),
        }
    }
}

/// A scored retrieval hit. Higher scores are better in every search mode.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub row: ChunkRow,
    pub score: f32,
}
