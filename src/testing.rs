//! Deterministic backends for unit tests.

use crate::error::{AdvisorError, Result};
use crate::ml::{CompletionBackend, Embedder};
use crate::models::{PackagingRecord, ProductProfile};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const TEST_MODEL: &str = "keyword-test-embedder";
const KEYWORD_DIMENSIONS: usize = 256;

/// Bag-of-words embedder: each lowercase token bumps one hashed bucket.
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0_f32; KEYWORD_DIMENSIONS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % KEYWORD_DIMENSIONS as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        TEST_MODEL
    }
}

/// Reports the same model as [`KeywordEmbedder`] but never answers.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AdvisorError::EmbeddingBackend(
            "connection refused".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        TEST_MODEL
    }
}

/// Returns a fixed response and records every prompt it receives.
pub struct ScriptedCompletion {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub struct FailingCompletion {
    message: String,
    calls: AtomicUsize,
}

impl FailingCompletion {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for FailingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AdvisorError::GenerationBackend(self.message.clone()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Sleeps for `delay` before answering.
pub struct StalledCompletion {
    delay: Duration,
}

impl StalledCompletion {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl CompletionBackend for StalledCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok("[]".to_string())
    }

    fn model_name(&self) -> &str {
        "stalled"
    }
}

pub fn electronics_record() -> PackagingRecord {
    PackagingRecord {
        product_id: Some("P001".to_string()),
        profile: ProductProfile::new("Electronics", 1.2, true, "Cold", "Low"),
        packaging_material: "Bubble Wrap".to_string(),
    }
}

pub fn food_record() -> PackagingRecord {
    PackagingRecord {
        product_id: Some("P002".to_string()),
        profile: ProductProfile::new("Food", 0.5, false, "Hot", "High"),
        packaging_material: "Vacuum Seal".to_string(),
    }
}

pub fn electronics_query() -> ProductProfile {
    ProductProfile::new("Electronics", 1.0, true, "Cold", "Low")
}
