use crate::error::{AdvisorError, Result};
use crate::ml::{complete_with_timeout, CompletionBackend, Embedder};
use crate::models::{ProductProfile, RecommendationResult, SourceSnippet};
use crate::services::context_builder::{render, render_question};
use crate::services::embedding_index::{CorpusDocument, EmbeddingIndex};
use lazy_static::lazy_static;
use regex::Regex;
use std::{path::Path, sync::Arc, time::Duration};
use tracing::{debug, info};

pub const DEFAULT_TOP_K: usize = 4;

const PROMPT_TEMPLATE: &str = "Based on the following product information and similar products from our database,
determine the most appropriate packaging material and explain why.

Context:
{context}

Question:
{question}

Please provide:
1. The recommended packaging material
2. A detailed explanation of why this packaging material is suitable";

lazy_static! {
    static ref MATERIAL_LABEL: Regex = Regex::new(
        r"(?i)recommended\s+packaging\s+materials?\b(?:\s+for\s+(?:this|the)\s+product)?(?:\s+(?:is|would\s+be))?"
    )
    .unwrap();
    static ref LIST_MARKER: Regex = Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").unwrap();
    static ref CLAUSE_BOUNDARY: Regex =
        Regex::new(r"(?i)[,;]|\.(?:\s|$)|\s+(?:because|since|due\s+to|as\s+it|which)\b").unwrap();
}

/// Retrieval-augmented recommendations over one persisted index.
///
/// Built once per process and shared; queries only read the index.
#[derive(Clone)]
pub struct RecommendationService {
    index: Arc<EmbeddingIndex>,
    generator: Arc<dyn CompletionBackend>,
    top_k: usize,
    generation_timeout: Duration,
}

impl RecommendationService {
    pub fn new(
        index: EmbeddingIndex,
        generator: Arc<dyn CompletionBackend>,
        top_k: usize,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            index: Arc::new(index),
            generator,
            top_k: top_k.max(1),
            generation_timeout,
        }
    }

    /// Loads the index at `index_path`, building it from the supplied corpus when needed.
    /// The service only exists once the index is complete.
    pub async fn initialize<F>(
        index_path: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn CompletionBackend>,
        corpus_supplier: F,
        top_k: usize,
        generation_timeout: Duration,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<Vec<CorpusDocument>>,
    {
        let index = EmbeddingIndex::load_or_build(index_path, embedder, corpus_supplier).await?;
        info!(
            "RecommendationService ready: {} indexed records, top_k={}, generator={}",
            index.len(),
            top_k,
            generator.model_name()
        );
        Ok(Self::new(index, generator, top_k, generation_timeout))
    }

    pub async fn recommend(&self, profile: &ProductProfile) -> Result<RecommendationResult> {
        profile.validate()?;

        let query_context = render(profile, None);
        let neighbors = self.index.query(&query_context, self.top_k).await?;
        debug!(
            "Retrieved {} neighbors for '{}': {:?}",
            neighbors.len(),
            profile.product_type,
            neighbors.iter().map(|n| (&n.id, n.score)).collect::<Vec<_>>()
        );

        let context = neighbors
            .iter()
            .map(|n| n.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_prompt(&context, &render_question(profile));

        let raw = complete_with_timeout(self.generator.as_ref(), &prompt, self.generation_timeout)
            .await?;
        if raw.trim().is_empty() {
            return Err(AdvisorError::GenerationBackend(
                "generation backend returned an empty response".to_string(),
            ));
        }

        let recommended_material = extract_material(&raw);
        info!(
            "Recommended '{}' for {} ({} kg)",
            recommended_material, profile.product_type, profile.weight_kg
        );

        Ok(RecommendationResult {
            recommended_material,
            explanation: raw,
            source_snippets: neighbors
                .into_iter()
                .map(|n| SourceSnippet {
                    id: n.id,
                    text: n.text,
                    score: n.score,
                })
                .collect(),
        })
    }
}

pub fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Pulls the material out of the narrative: the text after a "recommended
/// packaging material" label (or the next line if the label stands alone),
/// otherwise the first non-empty line.
pub fn extract_material(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        if let Some(label) = MATERIAL_LABEL.find(line) {
            let inline = labelled_value(&line[label.end()..]);
            if !inline.is_empty() {
                return inline;
            }
            if let Some(next) = lines[i + 1..]
                .iter()
                .map(|l| labelled_value(l))
                .find(|l| !l.is_empty())
            {
                return next;
            }
        }
    }

    lines
        .iter()
        .map(|l| clean_material(l))
        .find(|l| !l.is_empty())
        .unwrap_or_default()
}

/// The material named after a label, cut at the first clause break.
fn labelled_value(text: &str) -> String {
    let stripped = LIST_MARKER.replace(text, "");
    let text: &str = &stripped;
    let value = match CLAUSE_BOUNDARY.find(text) {
        Some(boundary) => &text[..boundary.start()],
        None => text,
    };
    clean_material(value)
}

fn clean_material(text: &str) -> String {
    let text = LIST_MARKER.replace(text, "");
    text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ':' | '*' | '-' | '"' | '\'' | '`' | '#')
    })
    .trim_end_matches('.')
    .trim()
    .to_string()
}
