//! Backend ports for embeddings and text generation, plus their Ollama adapters.

pub mod ollama_embedder;
pub mod ollama_generator;

use crate::error::{AdvisorError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

pub use ollama_embedder::OllamaEmbedder;
pub use ollama_generator::OllamaGenerator;

/// Turns text into a fixed-length vector.
///
/// Implementations must be deterministic for identical input, otherwise a
/// persisted index drifts away from freshly embedded queries.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Recorded in persisted indexes so a model switch forces a rebuild.
    fn model_name(&self) -> &str;
}

/// Single blocking-style completion call, no streaming.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Runs one completion under a deadline. The in-flight request is dropped when
/// the deadline passes. No retries.
pub async fn complete_with_timeout(
    backend: &dyn CompletionBackend,
    prompt: &str,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, backend.complete(prompt)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                "Generation backend '{}' exceeded {:?}, cancelling request",
                backend.model_name(),
                timeout
            );
            Err(AdvisorError::GenerationTimeout(timeout))
        }
    }
}
