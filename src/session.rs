//! Conversational retrieval over a built corpus.
//!
//! All per-conversation state lives in an explicit [`SessionContext`] that
//! the caller owns and passes into every orchestrator call: the corpus
//! reference, the turn history, and whether ingestion has completed. The
//! orchestrator itself is stateless.

use std::sync::Arc;

use tracing::warn;

use crate::index::{CorpusIndex, SearchMode};
use crate::providers::ChatProvider;
use crate::types::{ChatTurn, RagError};

const REWRITE_SYSTEM_PROMPT: &str = "Given the conversation so far, rewrite the user's latest \
     message into a standalone search query that captures what they are asking about. \
     Reply with the search query only, no commentary.";

const NO_CORPUS_ANSWER: &str =
    "I don't have any ingested sources to draw on yet, so I can't answer that.";

/// Per-conversation state: one corpus, one history, one readiness flag.
///
/// The corpus is single-owner and replace-only: a new ingestion run installs
/// a whole new [`CorpusIndex`], it never mutates the old one.
#[derive(Default)]
pub struct SessionContext {
    corpus: Option<CorpusIndex>,
    history: Vec<ChatTurn>,
    ingestion_complete: bool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly built corpus, marking the session ready.
    pub fn install_corpus(&mut self, corpus: CorpusIndex) {
        self.corpus = Some(corpus);
        self.ingestion_complete = true;
    }

    /// Whether a corpus is installed and ingestion finished.
    pub fn is_ready(&self) -> bool {
        self.ingestion_complete && self.corpus.is_some()
    }

    pub fn corpus(&self) -> Option<&CorpusIndex> {
        self.corpus.as_ref()
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Drops the corpus and history, returning the session to its initial
    /// state.
    pub fn reset(&mut self) {
        self.corpus = None;
        self.history.clear();
        self.ingestion_complete = false;
    }
}

/// Answers questions against a session's corpus.
pub struct RetrievalOrchestrator {
    chat: Arc<dyn ChatProvider>,
    top_k: usize,
}

impl RetrievalOrchestrator {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat, top_k: 5 }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Answers `question` from the session's corpus and history.
    ///
    /// Always returns an answer string: retrieval or generation failures
    /// come back as a user-readable error message rather than an `Err`, and
    /// the failed turn is left out of the history so a bad turn cannot skew
    /// later query rewrites.
    pub async fn answer(&self, session: &mut SessionContext, question: &str) -> String {
        if !session.is_ready() {
            return NO_CORPUS_ANSWER.to_string();
        }

        match self.try_answer(session, question).await {
            Ok(answer) => {
                session.history.push(ChatTurn::user(question));
                session.history.push(ChatTurn::assistant(answer.clone()));
                answer
            }
            Err(err) => {
                warn!(error = %err, "question could not be answered");
                format!("I encountered an error while processing your request: {err}")
            }
        }
    }

    async fn try_answer(
        &self,
        session: &SessionContext,
        question: &str,
    ) -> Result<String, RagError> {
        let corpus = session
            .corpus()
            .ok_or_else(|| RagError::InvalidInput("no corpus installed".to_string()))?;

        if corpus.is_empty().await? {
            return Ok(NO_CORPUS_ANSWER.to_string());
        }

        let query = self.rewrite_query(session, question).await?;
        let chunks = corpus
            .search(&query, self.top_k, SearchMode::Hybrid)
            .await?;

        let context_block = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let system = format!(
            "Answer the user's questions based only on the context below. \
             If the context does not contain the answer, say so.\n\n{context_block}"
        );
        self.chat
            .complete(&system, session.history(), question)
            .await
    }

    /// Resolves pronouns and follow-ups into a standalone query. The first
    /// turn has nothing to resolve against, so it skips the extra call.
    async fn rewrite_query(
        &self,
        session: &SessionContext,
        question: &str,
    ) -> Result<String, RagError> {
        if session.history().is_empty() {
            return Ok(question.to_string());
        }
        let rewritten = self
            .chat
            .complete(REWRITE_SYSTEM_PROMPT, session.history(), question)
            .await?;
        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(rewritten.to_string())
        }
    }
}
