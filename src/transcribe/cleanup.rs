use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::DISCARD_SENTINEL;
use crate::config::CleanupSettings;
use crate::error::PipelineError;

/// System instruction for the cleanup model. The sentinel escape hatch
/// lets the model reject transcripts that are mostly noise.
const CLEANUP_INSTRUCTION: &str = "You are a helpful assistant whose task is \
to correct any spelling discrepancies in the transcribed text. Only add \
necessary punctuation and use only the context provided. Respond ONLY with \
the corrected text but if too much of the content seems erroneous return '.'";

const CLEANUP_TEMPERATURE: f32 = 0.0;
const CLEANUP_MAX_TOKENS: u32 = 512;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CleanupRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CleanupResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// HTTP client for the transcript-cleanup model.
pub struct CleanupClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl CleanupClient {
    pub fn new(settings: &CleanupSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create cleanup HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    /// Clean one raw transcript. Returns `None` when the model judges
    /// the transcript unusable and no artifact should be created.
    pub async fn clean(&self, transcript: &str) -> Result<Option<String>, PipelineError> {
        let request = CleanupRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: CLEANUP_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: transcript,
                },
            ],
            temperature: CLEANUP_TEMPERATURE,
            max_tokens: CLEANUP_MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Cleanup(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PipelineError::Cleanup(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let parsed: CleanupResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Cleanup(format!("invalid response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::Cleanup("empty response".into()))?;

        let cleaned = content.trim().to_string();
        if cleaned == DISCARD_SENTINEL {
            debug!("Cleanup model returned the discard sentinel");
            return Ok(None);
        }

        Ok(Some(cleaned))
    }
}
