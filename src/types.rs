//! Shared error and conversation types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the ingestion and retrieval pipeline.
///
/// Per-source failures (`Fetch`, `UnsupportedFormat`, `Extraction`,
/// `Transcription`) are recovered inside the source adapters and never
/// propagate past them. `Embedding` and `Storage` abort the ingestion run
/// that raised them. `Generation` is recovered at the orchestrator boundary
/// and turned into a textual answer.
#[derive(Debug, Error)]
pub enum RagError {
    /// A network fetch failed or returned a non-success status.
    #[error("source unreachable: {0}")]
    Fetch(String),

    /// The file extension maps to no known document format.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Text extraction from a document failed.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The transcription capability failed or returned no text.
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// The embedding capability failed; fatal to the current build.
    #[error("embedding service failure: {0}")]
    Embedding(String),

    /// The corpus store rejected an operation.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The generation capability failed.
    #[error("generation failure: {0}")]
    Generation(String),

    /// A caller-supplied value was malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem failure while staging or reading scratch data.
    #[error("io failure: {0}")]
    Io(String),
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Fetch(err.to_string())
    }
}

impl From<tokio_rusqlite::Error> for RagError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        RagError::Storage(err.to_string())
    }
}

/// Speaker of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the running conversation held by a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}
