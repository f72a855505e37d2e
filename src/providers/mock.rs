//! Deterministic in-process providers for tests and offline runs.

use async_trait::async_trait;

use super::{ChatProvider, EmbeddingProvider, TranscriptionProvider};
use crate::types::{ChatTurn, RagError};

/// Hash-seeded embeddings: identical text always maps to the identical
/// vector, different text almost always to a different one.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dims: 8 }
    }

    pub fn with_dims(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn ndims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts
            .iter()
            .map(|text| hash_to_vec(text, self.dims))
            .collect())
    }
}

fn hash_to_vec(text: &str, dims: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dims)
        .map(|i| {
            let bits = seed.rotate_left((i as u32 % 64) * 8) ^ ((i as u64) << 24);
            (bits as f32) / u32::MAX as f32
        })
        .collect()
}

/// Scripted chat responses, replayed in order; repeats the last response
/// once the script is exhausted.
#[derive(Debug)]
pub struct MockChatProvider {
    responses: std::sync::Mutex<Vec<String>>,
    fallback: String,
}

impl MockChatProvider {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            responses: std::sync::Mutex::new(Vec::new()),
            fallback: fallback.into(),
        }
    }

    #[must_use]
    pub fn with_responses(self, responses: Vec<String>) -> Self {
        *self.responses.lock().expect("mock response lock poisoned") = responses;
        self
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(
        &self,
        _system: &str,
        _history: &[ChatTurn],
        _user: &str,
    ) -> Result<String, RagError> {
        let mut responses = self.responses.lock().expect("mock response lock poisoned");
        if responses.is_empty() {
            Ok(self.fallback.clone())
        } else {
            Ok(responses.remove(0))
        }
    }
}

/// Fixed transcript for any audio input.
#[derive(Clone, Debug)]
pub struct MockTranscriptionProvider {
    transcript: String,
}

impl MockTranscriptionProvider {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for MockTranscriptionProvider {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _file_name: &str,
        _language: &str,
    ) -> Result<String, RagError> {
        Ok(self.transcript.clone())
    }
}
