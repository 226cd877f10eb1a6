use crate::error::{AdvisorError, Result};
use crate::ml::CompletionBackend;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Text generation through Ollama's `/api/generate`, non-streaming.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
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
            temperature,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl CompletionBackend for OllamaGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Sending {} byte prompt to {}", prompt.len(), self.model);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdvisorError::GenerationTimeout(self.timeout)
                } else {
                    AdvisorError::GenerationBackend(format!("Ollama request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Ollama generate returned {}: {}", status, error_text);
            return Err(AdvisorError::GenerationBackend(format!(
                "Ollama returned {}: {}",
                status, error_text
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AdvisorError::GenerationTimeout(self.timeout)
            } else {
                AdvisorError::GenerationBackend(format!("Failed to parse Ollama response: {}", e))
            }
        })?;

        Ok(parsed.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_disables_streaming() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "hello",
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["stream"], serde_json::json!(false));
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["options"]["temperature"], serde_json::json!(0.0));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_generation_backend_error() {
        let generator =
            OllamaGenerator::new("http://127.0.0.1:9", "llama3.2", 0.0, Duration::from_secs(2))
                .unwrap();

        let err = generator.complete("prompt").await.unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::GenerationBackend(_) | AdvisorError::GenerationTimeout(_)
        ));
    }
}
