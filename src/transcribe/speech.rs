use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::TranscriptionSettings;
use crate::error::PipelineError;

/// Prompt discouraging the service from inventing words for noise.
const TRANSCRIPTION_PROMPT: &str = "don't translate or make up words to fill \
in the rest of the sentence. if background noise return .";

#[derive(Debug, Serialize)]
struct TranscriptionRequest<'a> {
    model: &'a str,
    audio_b64: String,
    language: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// HTTP client for the speech-to-text service.
pub struct SpeechToTextClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    language: String,
}

impl SpeechToTextClient {
    pub fn new(settings: &TranscriptionSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create transcription HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            language: settings.language.clone(),
        })
    }

    /// Transcribe a persisted audio file.
    ///
    /// The audio bytes ship base64-encoded in the request body. The
    /// returned text may be the discard sentinel; interpreting it is
    /// the caller's concern.
    pub async fn transcribe(&self, path: &Path) -> Result<String, PipelineError> {
        let audio = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::Transcription(format!("cannot read {:?}: {}", path, e)))?;

        let request = TranscriptionRequest {
            model: &self.model,
            audio_b64: BASE64.encode(&audio),
            language: &self.language,
            prompt: TRANSCRIPTION_PROMPT,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Transcription(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PipelineError::Transcription(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Transcription(format!("invalid response: {}", e)))?;

        info!("Transcript: {}", parsed.text);

        Ok(parsed.text)
    }
}
