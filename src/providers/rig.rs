//! Bridges from [`rig`](https://docs.rs/rig-core) models onto the
//! pipeline's capability traits.

use async_trait::async_trait;
use rig::agent::AgentBuilder;
use rig::completion::{Chat, CompletionModel, Message};
use rig::embeddings::embedding::EmbeddingModel;

use super::{ChatProvider, EmbeddingProvider};
use crate::types::{ChatRole, ChatTurn, RagError};

/// Adapts any rig embedding model to [`EmbeddingProvider`].
#[derive(Clone)]
pub struct RigEmbeddingProvider<E>
where
    E: EmbeddingModel,
{
    model: E,
}

impl<E> RigEmbeddingProvider<E>
where
    E: EmbeddingModel,
{
    pub fn new(model: E) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<E> EmbeddingProvider for RigEmbeddingProvider<E>
where
    E: EmbeddingModel + Sync,
{
    fn ndims(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self
            .model
            .embed_texts(texts.to_vec())
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        Ok(embeddings
            .into_iter()
            .map(|embedding| embedding.vec.into_iter().map(|value| value as f32).collect())
            .collect())
    }
}

/// Adapts any rig completion model to [`ChatProvider`].
///
/// Each call builds a throwaway agent carrying the supplied system prompt as
/// its preamble and replays the session history as chat history.
#[derive(Clone)]
pub struct RigChatProvider<M>
where
    M: CompletionModel,
{
    model: M,
    temperature: Option<f64>,
}

impl<M> RigChatProvider<M>
where
    M: CompletionModel,
{
    pub fn new(model: M) -> Self {
        Self {
            model,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl<M> ChatProvider for RigChatProvider<M>
where
    M: CompletionModel + Sync,
{
    async fn complete(
        &self,
        system: &str,
        history: &[ChatTurn],
        user: &str,
    ) -> Result<String, RagError> {
        let mut builder = AgentBuilder::new(self.model.clone()).preamble(system);
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        let agent = builder.build();

        let chat_history: Vec<Message> = history
            .iter()
            .map(|turn| match turn.role {
                ChatRole::User => Message::user(turn.text.clone()),
                ChatRole::Assistant => Message::assistant(turn.text.clone()),
            })
            .collect();

        agent
            .chat(user, chat_history)
            .await
            .map_err(|err| RagError::Generation(err.to_string()))
    }
}
