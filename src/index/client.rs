use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::splitter::split_text;
use crate::config::IndexSettings;
use crate::error::PipelineError;

/// Chunks, embeds, and upserts one combined document as a unit.
#[async_trait::async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Returns the number of chunks written; zero means there was
    /// nothing to index and no upsert was attempted.
    async fn upsert(&self, document: &str) -> Result<usize, PipelineError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct VectorRecord {
    id: String,
    values: Vec<f32>,
    metadata: VectorMetadata,
}

#[derive(Debug, Serialize)]
struct VectorMetadata {
    text: String,
}

/// HTTP client for the embedding service and the named vector index.
pub struct VectorIndexClient {
    client: Client,
    embed_endpoint: String,
    upsert_endpoint: String,
    api_key: String,
    embed_model: String,
    index_name: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl VectorIndexClient {
    pub fn new(settings: &IndexSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create index HTTP client")?;

        Ok(Self {
            client,
            embed_endpoint: settings.embed_endpoint.clone(),
            upsert_endpoint: settings.upsert_endpoint.clone(),
            api_key: settings.api_key.clone(),
            embed_model: settings.embed_model.clone(),
            index_name: settings.index_name.clone(),
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        })
    }

    async fn embed(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let request = EmbeddingRequest {
            model: &self.embed_model,
            input: chunks,
        };

        let response = self
            .client
            .post(&self.embed_endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Indexing(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PipelineError::Indexing(format!(
                "embedding service returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Indexing(format!("invalid embedding response: {}", e)))?;

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait::async_trait]
impl DocumentIndexer for VectorIndexClient {
    async fn upsert(&self, document: &str) -> Result<usize, PipelineError> {
        let chunks = split_text(document, self.chunk_size, self.chunk_overlap);
        if chunks.is_empty() {
            info!("Nothing to upsert");
            return Ok(0);
        }

        let embeddings = self.embed(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(PipelineError::Indexing(format!(
                "embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let vectors: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| VectorRecord {
                id: Uuid::new_v4().to_string(),
                values,
                metadata: VectorMetadata {
                    text: chunk.clone(),
                },
            })
            .collect();

        let body = serde_json::json!({
            "index": self.index_name,
            "vectors": vectors,
        });

        let response = self
            .client
            .post(&self.upsert_endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Indexing(format!("upsert request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PipelineError::Indexing(format!(
                "index returned {}: {}",
                status, body
            )));
        }

        info!(
            "Upserted {} chunks into index '{}'",
            chunks.len(),
            self.index_name
        );

        Ok(chunks.len())
    }
}
