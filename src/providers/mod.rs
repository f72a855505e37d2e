//! Capability interfaces for the external services the pipeline depends on.
//!
//! Embedding, generation, transcription, and reranking are all consumed
//! through these traits so the pipeline can run against production backends
//! ([`rig`] bridges, the HTTP transcription client) or the deterministic
//! mocks used throughout the tests.

pub mod http;
pub mod mock;
pub mod rig;

use async_trait::async_trait;

use crate::types::{ChatTurn, RagError};

pub use self::http::HttpTranscriptionProvider;
pub use self::mock::{MockChatProvider, MockEmbeddingProvider, MockTranscriptionProvider};
pub use self::rig::{RigChatProvider, RigEmbeddingProvider};

/// Embeds text into fixed-dimensional vectors.
///
/// Implementations must be deterministic per input within one index's
/// lifetime and must return one vector of exactly [`ndims`](Self::ndims)
/// components per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Vector dimensionality, constant for the provider's lifetime.
    fn ndims(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("provider returned no vector".to_string()))
    }
}

/// Produces a completion bound to a system instruction and prior turns.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        history: &[ChatTurn],
        user: &str,
    ) -> Result<String, RagError>;
}

/// Turns audio bytes into a transcript.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        file_name: &str,
        language: &str,
    ) -> Result<String, RagError>;
}

/// Optional second-stage relevance scorer for retrieval candidates.
///
/// Returns one score per document (higher is more relevant to the query).
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, RagError>;
}
