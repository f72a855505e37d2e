//! Speech-to-text over an OpenAI-compatible `audio/transcriptions` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};

use super::TranscriptionProvider;
use crate::types::RagError;

pub const DEFAULT_TRANSCRIPTION_ENDPOINT: &str =
    "https://api.openai.com/v1/audio/transcriptions";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Multipart client for whisper-style transcription services.
#[derive(Clone, Debug)]
pub struct HttpTranscriptionProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpTranscriptionProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: DEFAULT_TRANSCRIPTION_ENDPOINT.to_string(),
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            api_key: None,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl TranscriptionProvider for HttpTranscriptionProvider {
    async fn transcribe(
        &self,
        audio: &[u8],
        file_name: &str,
        language: &str,
    ) -> Result<String, RagError> {
        let part = Part::bytes(audio.to_vec()).file_name(file_name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.to_string())
            .text("response_format", "text".to_string());

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| RagError::Transcription(err.to_string()))?
            .error_for_status()
            .map_err(|err| RagError::Transcription(err.to_string()))?;

        response
            .text()
            .await
            .map_err(|err| RagError::Transcription(err.to_string()))
    }
}
