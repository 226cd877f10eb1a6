use crate::error::{AdvisorError, Result};
use crate::ml::Embedder;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const MAX_TEXT_PREVIEW_LENGTH: usize = 60;

/// Embeddings from a local Ollama server (`/api/embeddings`).
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AdvisorError::Internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            "Embedding text with {}: '{}'",
            self.model,
            text.chars().take(MAX_TEXT_PREVIEW_LENGTH).collect::<String>()
        );

        let response = self
            .client
            .post(self.endpoint())
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| {
                AdvisorError::EmbeddingBackend(format!("Ollama request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Ollama embeddings returned {}: {}", status, error_text);
            return Err(AdvisorError::EmbeddingBackend(format!(
                "Ollama returned {}: {}",
                status, error_text
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            AdvisorError::EmbeddingBackend(format!("Failed to parse Ollama response: {}", e))
        })?;

        if parsed.embedding.is_empty() {
            return Err(AdvisorError::EmbeddingBackend(
                "Ollama returned an empty embedding".to_string(),
            ));
        }

        Ok(parsed.embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let embedder =
            OllamaEmbedder::new("http://localhost:11434/", "mxbai-embed-large", Duration::from_secs(1))
                .unwrap();

        assert_eq!(embedder.endpoint(), "http://localhost:11434/api/embeddings");
        assert_eq!(embedder.model_name(), "mxbai-embed-large");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_embedding_backend_error() {
        // Port 9 (discard) is not expected to host an Ollama server.
        let embedder =
            OllamaEmbedder::new("http://127.0.0.1:9", "mxbai-embed-large", Duration::from_secs(2))
                .unwrap();

        let err = embedder.embed("Electronics").await.unwrap_err();
        assert!(matches!(err, AdvisorError::EmbeddingBackend(_)));
    }
}
