//! Audio adapter: one media URL to at most one transcript record.

use std::sync::Arc;

use reqwest::Client;
use tracing::warn;
use url::Url;

use super::{AdapterOutput, RawRecord};
use crate::providers::TranscriptionProvider;
use crate::scratch::ScratchWorkspace;
use crate::types::RagError;

/// Downloads the audio behind a media URL and transcribes it once.
pub struct AudioSource<'a> {
    client: Client,
    transcriber: Arc<dyn TranscriptionProvider>,
    scratch: &'a ScratchWorkspace,
    language: String,
}

impl<'a> AudioSource<'a> {
    pub fn new(
        client: Client,
        transcriber: Arc<dyn TranscriptionProvider>,
        scratch: &'a ScratchWorkspace,
        language: impl Into<String>,
    ) -> Self {
        Self {
            client,
            transcriber,
            scratch,
            language: language.into(),
        }
    }

    /// Yields exactly one record on success, zero on any failure. A garbled
    /// transcript is accepted as-is; only an empty one counts as failure.
    pub async fn load_media(&self, url: &Url) -> AdapterOutput {
        match self.transcribe_url(url).await {
            Ok(text) => AdapterOutput {
                records: vec![RawRecord::new(url.as_str(), text)],
                sources_processed: 1,
            },
            Err(err) => {
                warn!(url = %url, error = %err, "media source skipped");
                AdapterOutput::default()
            }
        }
    }

    async fn transcribe_url(&self, url: &Url) -> Result<String, RagError> {
        let bytes = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        // Stage the download so the transcription call never depends on the
        // network copy being alive.
        let staged = self.scratch.unique_path("audio", "mp3");
        tokio::fs::write(&staged, &bytes).await?;

        let file_name = staged
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let transcript = self
            .transcriber
            .transcribe(&bytes, &file_name, &self.language)
            .await?;

        if transcript.trim().is_empty() {
            return Err(RagError::Transcription(
                "transcription returned no text".to_string(),
            ));
        }
        Ok(transcript)
    }
}
