//! Persisted cosine-similarity index over rendered corpus snippets.
//!
//! The artifact lives at `<location>/index.json`. [`EmbeddingIndex::load_or_build`]
//! prefers the stored artifact and rebuilds whenever it cannot be used, so a
//! corrupted or stale artifact heals itself on the next start.

use crate::error::{AdvisorError, Result};
use crate::ml::Embedder;
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const INDEX_FILE: &str = "index.json";
const FORMAT_VERSION: u32 = 1;

/// A text to index, with the id handed back by queries.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusDocument {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub build_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub embedding_model: String,
    pub dimensions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    text: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredIndex {
    manifest: IndexManifest,
    entries: Vec<StoredEntry>,
}

struct IndexEntry {
    id: String,
    text: String,
    vector: Array1<f32>,
    norm: f32,
}

impl IndexEntry {
    fn new(id: String, text: String, embedding: Vec<f32>) -> Self {
        let vector = Array1::from(embedding);
        let norm = vector.dot(&vector).sqrt();
        Self {
            id,
            text,
            vector,
            norm,
        }
    }
}

/// Handle to a built or loaded index. Entries are fixed once constructed;
/// replacing them means building a new index.
pub struct EmbeddingIndex {
    location: PathBuf,
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("location", &self.location)
            .field("manifest", &self.manifest)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl EmbeddingIndex {
    /// Embeds every document and persists the result at `location`.
    pub async fn build(
        location: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
        corpus: Vec<CorpusDocument>,
    ) -> Result<Self> {
        let location = location.as_ref().to_path_buf();
        if corpus.is_empty() {
            return Err(AdvisorError::EmptyCorpus);
        }

        info!(
            "Building index at {} from {} documents with {}",
            location.display(),
            corpus.len(),
            embedder.model_name()
        );

        let texts: Vec<String> = corpus.iter().map(|doc| doc.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != corpus.len() {
            return Err(AdvisorError::EmbeddingBackend(format!(
                "expected {} embeddings, got {}",
                corpus.len(),
                embeddings.len()
            )));
        }

        let dimensions = embeddings[0].len();
        if dimensions == 0 {
            return Err(AdvisorError::EmbeddingBackend(
                "embedding backend returned zero-length vectors".to_string(),
            ));
        }
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dimensions) {
            return Err(AdvisorError::EmbeddingBackend(format!(
                "inconsistent embedding dimensions: document '{}' has {}, expected {}",
                corpus[bad].id,
                embeddings[bad].len(),
                dimensions
            )));
        }

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
            embedding_model: embedder.model_name().to_string(),
            dimensions,
        };

        let stored = StoredIndex {
            manifest,
            entries: corpus
                .into_iter()
                .zip(embeddings)
                .map(|(doc, embedding)| StoredEntry {
                    id: doc.id,
                    text: doc.text,
                    embedding,
                })
                .collect(),
        };
        persist(&location, &stored)?;

        info!(
            "Persisted index {} ({} entries, {} dimensions)",
            stored.manifest.build_id,
            stored.entries.len(),
            dimensions
        );
        Ok(Self::from_stored(location, stored, embedder))
    }

    /// Reads a persisted index. Fails with `IndexLoad` on anything unusable.
    pub fn load(location: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let location = location.as_ref().to_path_buf();
        let path = location.join(INDEX_FILE);

        let raw = fs::read_to_string(&path).map_err(|e| {
            AdvisorError::IndexLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        let stored: StoredIndex = serde_json::from_str(&raw).map_err(|e| {
            AdvisorError::IndexLoad(format!("cannot parse {}: {}", path.display(), e))
        })?;

        let manifest = &stored.manifest;
        if manifest.format_version != FORMAT_VERSION {
            return Err(AdvisorError::IndexLoad(format!(
                "unsupported format version {}",
                manifest.format_version
            )));
        }
        if manifest.embedding_model != embedder.model_name() {
            return Err(AdvisorError::IndexLoad(format!(
                "index was built with '{}', configured embedder is '{}'",
                manifest.embedding_model,
                embedder.model_name()
            )));
        }
        if stored.entries.is_empty() {
            return Err(AdvisorError::IndexLoad("index has no entries".to_string()));
        }
        if let Some(entry) = stored
            .entries
            .iter()
            .find(|e| e.embedding.len() != manifest.dimensions)
        {
            return Err(AdvisorError::IndexLoad(format!(
                "entry '{}' has {} dimensions, manifest says {}",
                entry.id,
                entry.embedding.len(),
                manifest.dimensions
            )));
        }

        info!(
            "Loaded index {} from {} ({} entries)",
            manifest.build_id,
            location.display(),
            stored.entries.len()
        );
        Ok(Self::from_stored(location, stored, embedder))
    }

    /// Loads the stored index if there is one, otherwise (or if loading fails)
    /// builds from `corpus_supplier`, which is only invoked when a build happens.
    pub async fn load_or_build<F>(
        location: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
        corpus_supplier: F,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<Vec<CorpusDocument>>,
    {
        let location = location.as_ref();
        if location.join(INDEX_FILE).exists() {
            match Self::load(location, embedder.clone()) {
                Ok(index) => return Ok(index),
                Err(e) => warn!(
                    "Discarding stored index at {}: {}. Rebuilding",
                    location.display(),
                    e
                ),
            }
        } else {
            info!("No stored index at {}, building", location.display());
        }

        let corpus = corpus_supplier()?;
        Self::build(location, embedder, corpus).await
    }

    /// Nearest entries to `text`, best first. `k` above the index size is clamped.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(AdvisorError::InvalidQuery(
                "k must be at least 1".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(AdvisorError::InvalidQuery(
                "query text cannot be empty".to_string(),
            ));
        }

        let embedding = self.embedder.embed(text).await?;
        if embedding.len() != self.manifest.dimensions {
            return Err(AdvisorError::EmbeddingBackend(format!(
                "query embedding has {} dimensions, index has {}",
                embedding.len(),
                self.manifest.dimensions
            )));
        }

        let query = Array1::from(embedding);
        let query_norm = query.dot(&query).sqrt();

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&query, query_norm, entry)))
            .collect();
        // stable sort keeps corpus order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let k = k.min(self.entries.len());
        debug!("Returning top {} of {} entries", k, self.entries.len());

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| Neighbor {
                id: self.entries[i].id.clone(),
                text: self.entries[i].text.clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    fn from_stored(location: PathBuf, stored: StoredIndex, embedder: Arc<dyn Embedder>) -> Self {
        let entries = stored
            .entries
            .into_iter()
            .map(|e| IndexEntry::new(e.id, e.text, e.embedding))
            .collect();
        Self {
            location,
            manifest: stored.manifest,
            entries,
            embedder,
        }
    }
}

fn cosine_similarity(query: &Array1<f32>, query_norm: f32, entry: &IndexEntry) -> f32 {
    if query_norm == 0.0 || entry.norm == 0.0 {
        return 0.0;
    }
    query.dot(&entry.vector) / (query_norm * entry.norm)
}

/// Writes to a temporary file and renames it over the artifact, so concurrent
/// builders overwrite each other whole (last writer wins).
fn persist(location: &Path, stored: &StoredIndex) -> Result<()> {
    fs::create_dir_all(location)?;
    let path = location.join(INDEX_FILE);
    let tmp = location.join(format!("{}.{}.tmp", INDEX_FILE, stored.manifest.build_id));

    fs::write(&tmp, serde_json::to_vec(stored)?)?;
    fs::rename(&tmp, &path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AdvisorError::Io(format!("cannot replace {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::context_builder::{corpus_documents, render};
    use crate::testing::{
        electronics_query, electronics_record, food_record, FailingEmbedder, KeywordEmbedder,
    };

    fn corpus() -> Vec<CorpusDocument> {
        corpus_documents(&[electronics_record(), food_record()])
    }

    fn keyword_embedder() -> Arc<dyn Embedder> {
        Arc::new(KeywordEmbedder::new())
    }

    #[tokio::test]
    async fn test_build_rejects_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(KeywordEmbedder::new());
        let err = EmbeddingIndex::build(dir.path(), embedder.clone(), Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::EmptyCorpus));
        assert_eq!(embedder.calls(), 0);
        assert!(!dir.path().join(INDEX_FILE).exists());
    }

    #[tokio::test]
    async fn test_build_surfaces_backend_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmbeddingIndex::build(dir.path(), Arc::new(FailingEmbedder), corpus())
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::EmbeddingBackend(_)));
    }

    #[tokio::test]
    async fn test_top_neighbor_is_matching_product() {
        let dir = tempfile::tempdir().unwrap();
        let index = EmbeddingIndex::build(dir.path(), keyword_embedder(), corpus())
            .await
            .unwrap();

        let neighbors = index
            .query(&render(&electronics_query(), None), 1)
            .await
            .unwrap();

        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].id, "P001");
        assert!(neighbors[0].text.contains("Bubble Wrap"));
    }

    #[tokio::test]
    async fn test_k_is_clamped_to_index_size() {
        let dir = tempfile::tempdir().unwrap();
        let index = EmbeddingIndex::build(dir.path(), keyword_embedder(), corpus())
            .await
            .unwrap();

        let neighbors = index.query("Electronics", 10).await.unwrap();
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors[0].score >= neighbors[1].score);
    }

    #[tokio::test]
    async fn test_zero_k_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let index = EmbeddingIndex::build(dir.path(), keyword_embedder(), corpus())
            .await
            .unwrap();

        let err = index.query("Electronics", 0).await.unwrap_err();
        assert!(matches!(err, AdvisorError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_second_load_or_build_loads_without_rebuilding() {
        let dir = tempfile::tempdir().unwrap();
        let first = EmbeddingIndex::load_or_build(dir.path(), keyword_embedder(), || Ok(corpus()))
            .await
            .unwrap();

        // Any rebuild here would fail: the supplier errors and the embedder is down.
        let second = EmbeddingIndex::load_or_build(dir.path(), Arc::new(FailingEmbedder), || {
            Err(AdvisorError::Internal("corpus must not be read".to_string()))
        })
        .await
        .unwrap();

        assert_eq!(second.len(), 2);
        assert_eq!(second.manifest().build_id, first.manifest().build_id);
    }

    #[tokio::test]
    async fn test_corrupted_artifact_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), b"{ not an index").unwrap();

        let index = EmbeddingIndex::load_or_build(dir.path(), keyword_embedder(), || Ok(corpus()))
            .await
            .unwrap();
        assert_eq!(index.len(), 2);

        let neighbors = index.query("Food Hot High", 1).await.unwrap();
        assert_eq!(neighbors[0].id, "P002");

        // the rebuilt artifact is now loadable
        assert!(EmbeddingIndex::load(dir.path(), keyword_embedder()).is_ok());
    }

    #[tokio::test]
    async fn test_load_rejects_other_embedding_model() {
        let dir = tempfile::tempdir().unwrap();
        EmbeddingIndex::build(dir.path(), keyword_embedder(), corpus())
            .await
            .unwrap();

        let raw = fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
        let mut stored: StoredIndex = serde_json::from_str(&raw).unwrap();
        stored.manifest.embedding_model = "nomic-embed-text".to_string();
        fs::write(
            dir.path().join(INDEX_FILE),
            serde_json::to_vec(&stored).unwrap(),
        )
        .unwrap();

        let err = EmbeddingIndex::load(dir.path(), keyword_embedder()).unwrap_err();
        assert!(matches!(err, AdvisorError::IndexLoad(_)));
    }

    #[test]
    fn test_load_missing_storage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmbeddingIndex::load(dir.path().join("absent"), keyword_embedder()).unwrap_err();
        assert!(matches!(err, AdvisorError::IndexLoad(_)));
    }

    #[tokio::test]
    async fn test_missing_storage_builds_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("vector_store");
        EmbeddingIndex::load_or_build(&location, keyword_embedder(), || Ok(corpus()))
            .await
            .unwrap();

        let files: Vec<_> = fs::read_dir(&location)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec![INDEX_FILE.to_string()]);
    }
}
