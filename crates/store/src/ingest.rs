//! Document ingestion: split, embed, store, then maintain once.

use crate::cache::{CachedChunk, ChunkCache};
use crate::embeddings::{embed_in_batches, EmbeddingProvider};
use crate::maintenance::IndexMaintainer;
use crate::namespace::Namespace;
use crate::namespace_store::NamespaceStore;
use crate::splitter::{SplitConfig, TextSplitter};
use crate::types::{AddDocumentOutcome, ChunkRecord, DocumentInput, TEXT_METADATA_KEY};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vecgraph_core::{AppError, AppResult};

/// Document metadata keys repeated in each chunk's header, with the label used there.
const HEADER_FIELDS: &[(&str, &str)] = &[
    ("title", "sourceDocument"),
    ("published", "published"),
];

#[derive(Debug, Clone)]
pub struct IngestionOrchestrator {
    store: NamespaceStore,
    maintainer: IndexMaintainer,
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: Arc<dyn TextSplitter>,
    split_config: SplitConfig,
    batch_size: usize,
    cache: Option<Arc<dyn ChunkCache>>,
}

impl IngestionOrchestrator {
    pub fn new(
        store: NamespaceStore,
        maintainer: IndexMaintainer,
        embedder: Arc<dyn EmbeddingProvider>,
        splitter: Arc<dyn TextSplitter>,
        split_config: SplitConfig,
    ) -> Self {
        Self {
            store,
            maintainer,
            embedder,
            splitter,
            split_config,
            batch_size: usize::MAX,
            cache: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ChunkCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Ingest one document. Never returns an error; failures are reported
    /// as `vectorized: false` with a message.
    pub async fn add_document(
        &self,
        namespace: &Namespace,
        document: DocumentInput,
        cache_key: Option<&str>,
    ) -> AddDocumentOutcome {
        let doc_id = document.doc_id.clone();
        match self.ingest(namespace, document, cache_key).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "[ingest] document '{}' in '{}' was not vectorized: {}",
                    doc_id, namespace, e
                );
                AddDocumentOutcome::failed(e.to_string())
            }
        }
    }

    async fn ingest(
        &self,
        namespace: &Namespace,
        document: DocumentInput,
        cache_key: Option<&str>,
    ) -> AppResult<AddDocumentOutcome> {
        if document.page_content.trim().is_empty() {
            info!("[ingest] document '{}' has no content; skipping", document.doc_id);
            return Ok(AddDocumentOutcome::skipped());
        }

        let entry_key = cache_key.map(|key| cache_entry_key(key, &document.page_content));
        let cache_key = entry_key.as_deref();

        let (records, from_cache) = match self.replay_cache(&document, cache_key).await {
            Some(records) => (records, true),
            None => (self.split_and_embed(&document).await?, false),
        };

        self.store.insert_all(namespace, &records).await?;
        info!(
            "[ingest] stored {} chunks of '{}' in '{}'{}",
            records.len(),
            document.doc_id,
            namespace,
            if from_cache { " (from cache)" } else { "" }
        );

        if !from_cache {
            self.write_cache(&records, cache_key).await;
        }

        let report = self.maintainer.run(namespace).await;
        if !report.is_success() {
            warn!(
                "[ingest] chunks of '{}' are stored but the graph of '{}' is stale until the next maintenance pass",
                document.doc_id, namespace
            );
        }

        Ok(AddDocumentOutcome::vectorized(records.len(), from_cache))
    }

    async fn replay_cache(
        &self,
        document: &DocumentInput,
        cache_key: Option<&str>,
    ) -> Option<Vec<ChunkRecord>> {
        let (cache, key) = (self.cache.as_ref()?, cache_key?);

        let cached = match cache.load(key).await {
            Ok(Some(chunks)) if !chunks.is_empty() => chunks,
            Ok(_) => return None,
            Err(e) => {
                warn!("[ingest] ignoring unreadable cache entry for {}: {}", key, e);
                return None;
            }
        };

        debug!("[ingest] replaying {} cached chunks for {}", cached.len(), key);
        Some(
            cached
                .into_iter()
                .map(|chunk| {
                    let mut metadata = match chunk.metadata {
                        Value::Object(map) => map,
                        _ => document.metadata.clone(),
                    };
                    metadata.insert(TEXT_METADATA_KEY.to_string(), Value::String(chunk.text.clone()));
                    ChunkRecord::new(&document.doc_id, chunk.text, Value::Object(metadata), chunk.vector)
                })
                .collect(),
        )
    }

    async fn split_and_embed(&self, document: &DocumentInput) -> AppResult<Vec<ChunkRecord>> {
        let config = self
            .split_config
            .clone()
            .with_header_metadata(header_metadata(&document.metadata));
        let texts = self.splitter.split(&document.page_content, &config)?;
        if texts.is_empty() {
            return Err(AppError::Embedding(format!(
                "document '{}' produced no chunks",
                document.doc_id
            )));
        }

        let vectors = embed_in_batches(self.embedder.as_ref(), &texts, self.batch_size).await?;
        if vectors.is_empty() || vectors.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "{} returned {} vectors for {} chunks",
                self.embedder.provider_name(),
                vectors.len(),
                texts.len()
            )));
        }

        Ok(texts
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(TEXT_METADATA_KEY.to_string(), Value::String(text.clone()));
                ChunkRecord::new(&document.doc_id, text, Value::Object(metadata), vector)
            })
            .collect())
    }

    async fn write_cache(&self, records: &[ChunkRecord], cache_key: Option<&str>) {
        let (Some(cache), Some(key)) = (self.cache.as_ref(), cache_key) else {
            return;
        };

        let chunks: Vec<CachedChunk> = records
            .iter()
            .filter_map(|r| {
                r.embedding.as_ref().map(|vector| CachedChunk {
                    text: r.page_content.clone(),
                    vector: vector.clone(),
                    metadata: r.metadata.clone(),
                })
            })
            .collect();

        if let Err(e) = cache.store(key, &chunks).await {
            warn!("[ingest] could not cache chunks for {}: {}", key, e);
        }
    }
}

/// Cache entry for `key` holding exactly `content`; an edited file under the
/// same key gets a different entry.
pub fn cache_entry_key(key: &str, content: &str) -> String {
    format!("{}#{:x}", key, Sha256::digest(content.as_bytes()))
}

fn header_metadata(metadata: &Map<String, Value>) -> Map<String, Value> {
    HEADER_FIELDS
        .iter()
        .filter_map(|(key, label)| metadata.get(*key).map(|v| (label.to_string(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileChunkCache;
    use crate::connection::ConnectionManager;
    use crate::splitter::SemanticSplitter;
    use crate::tests::support::{memory_manager, EmptyEmbedder, ParagraphSplitter, StaticEmbedder};
    use serde_json::json;
    use tempfile::TempDir;

    fn orchestrator(
        manager: &Arc<ConnectionManager>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> IngestionOrchestrator {
        IngestionOrchestrator::new(
            NamespaceStore::new(Arc::clone(manager)),
            IndexMaintainer::new(Arc::clone(manager), 5),
            embedder,
            Arc::new(ParagraphSplitter),
            SplitConfig::new(1000, 20),
        )
    }

    fn paragraphs_embedder() -> Arc<StaticEmbedder> {
        Arc::new(
            StaticEmbedder::new(2)
                .with("alpha", vec![1.0, 0.0])
                .with("beta", vec![0.8, 0.6])
                .with("gamma", vec![0.0, 1.0]),
        )
    }

    fn acme() -> Namespace {
        Namespace::parse("acme").unwrap()
    }

    #[tokio::test]
    async fn test_empty_document_is_skipped() {
        let manager = memory_manager();
        let embedder = paragraphs_embedder();
        let ingest = orchestrator(&manager, embedder.clone());

        let outcome = ingest
            .add_document(&acme(), DocumentInput::new("d1", "   "), None)
            .await;
        assert_eq!(outcome, AddDocumentOutcome::skipped());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_chunks_carry_metadata_and_text() {
        let manager = memory_manager();
        let ingest = orchestrator(&manager, paragraphs_embedder());
        let doc = DocumentInput::new("d1", "alpha\n\nbeta\n\ngamma").with_metadata("title", "x");

        let outcome = ingest.add_document(&acme(), doc, None).await;
        assert!(outcome.vectorized, "{:?}", outcome.error);
        assert_eq!(outcome.chunk_count, 3);

        let engine = manager.connect().await.unwrap();
        assert_eq!(engine.count_chunks(&acme()).await.unwrap(), 3);
        let hits = engine.direct_similarity(&acme(), &[1.0, 0.0], &[], 0.99).await.unwrap();
        assert_eq!(hits[0].chunk.metadata, json!({ "title": "x", "text": "alpha" }));
    }

    #[tokio::test]
    async fn test_maintenance_runs_after_insert() {
        let manager = memory_manager();
        let ingest = orchestrator(&manager, paragraphs_embedder());

        ingest
            .add_document(&acme(), DocumentInput::new("d1", "alpha\n\nbeta"), None)
            .await;

        let engine = manager.connect().await.unwrap();
        assert!(engine.projection_exists("acme-knn").await.unwrap());
        assert_eq!(engine.edge_count(&acme()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_embedding_failure_commits_nothing() {
        let manager = memory_manager();
        let ingest = orchestrator(&manager, paragraphs_embedder());

        let outcome = ingest
            .add_document(&acme(), DocumentInput::new("d1", "alpha\n\nunknown"), None)
            .await;
        assert!(!outcome.vectorized);
        assert!(outcome.error.is_some());

        let engine = manager.connect().await.unwrap();
        assert_eq!(engine.count_chunks(&acme()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_embedding_batch_is_fatal() {
        let manager = memory_manager();
        let ingest = orchestrator(&manager, Arc::new(EmptyEmbedder));

        let outcome = ingest
            .add_document(&acme(), DocumentInput::new("d1", "alpha"), None)
            .await;
        assert!(!outcome.vectorized);
    }

    #[tokio::test]
    async fn test_cache_round_trip_skips_embedder() {
        let temp = TempDir::new().unwrap();
        let cache: Arc<dyn ChunkCache> = Arc::new(FileChunkCache::new(temp.path()));
        let manager = memory_manager();
        let embedder = paragraphs_embedder();
        let ingest = orchestrator(&manager, embedder.clone()).with_cache(Arc::clone(&cache));

        let first = ingest
            .add_document(&acme(), DocumentInput::new("d1", "alpha\n\nbeta"), Some("/docs/a.md"))
            .await;
        assert!(first.vectorized && !first.from_cache);
        assert!(cache
            .exists(&cache_entry_key("/docs/a.md", "alpha\n\nbeta"))
            .await
            .unwrap());
        let calls = embedder.calls();

        let second = ingest
            .add_document(&acme(), DocumentInput::new("d2", "alpha\n\nbeta"), Some("/docs/a.md"))
            .await;
        assert!(second.vectorized && second.from_cache);
        assert_eq!(second.chunk_count, 2);
        assert_eq!(embedder.calls(), calls);

        let engine = manager.connect().await.unwrap();
        let docs = engine.list_documents(&acme()).await.unwrap();
        assert_eq!(docs.iter().map(|d| d.doc_id.as_str()).collect::<Vec<_>>(), vec!["d1", "d2"]);
    }

    #[tokio::test]
    async fn test_changed_content_under_same_key_is_embedded_again() {
        let temp = TempDir::new().unwrap();
        let manager = memory_manager();
        let embedder = paragraphs_embedder();
        let ingest = orchestrator(&manager, embedder.clone())
            .with_cache(Arc::new(FileChunkCache::new(temp.path())));
        let store = NamespaceStore::new(Arc::clone(&manager));

        let first = ingest
            .add_document(&acme(), DocumentInput::new("d1", "alpha"), Some("/notes.md"))
            .await;
        assert!(first.vectorized && !first.from_cache);
        store.delete_by_document(&acme(), "d1").await.unwrap();

        let second = ingest
            .add_document(&acme(), DocumentInput::new("d1", "gamma"), Some("/notes.md"))
            .await;
        assert!(second.vectorized, "{:?}", second.error);
        assert!(!second.from_cache);

        let engine = manager.connect().await.unwrap();
        let stored = engine.direct_similarity(&acme(), &[0.0, 1.0], &[], -1.0).await.unwrap();
        let texts: Vec<&str> = stored.iter().map(|s| s.chunk.page_content.as_str()).collect();
        assert_eq!(texts, vec!["gamma"]);
    }

    #[test]
    fn test_cache_entry_key_tracks_content() {
        let a = cache_entry_key("/notes.md", "old text");
        assert_eq!(a, cache_entry_key("/notes.md", "old text"));
        assert_ne!(a, cache_entry_key("/notes.md", "new text"));
        assert_ne!(a, cache_entry_key("/other.md", "old text"));
        assert!(a.starts_with("/notes.md#"));
    }

    #[tokio::test]
    async fn test_semantic_splitter_header_reaches_embedder() {
        let manager = memory_manager();
        let embedder = Arc::new(crate::embeddings::providers::mock::MockProvider::new(32));
        let ingest = IngestionOrchestrator::new(
            NamespaceStore::new(Arc::clone(&manager)),
            IndexMaintainer::new(Arc::clone(&manager), 5),
            embedder,
            Arc::new(SemanticSplitter),
            SplitConfig::new(1000, 0),
        );
        let doc = DocumentInput::new("d1", "Quarterly numbers.").with_metadata("title", "report.md");

        assert!(ingest.add_document(&acme(), doc, None).await.vectorized);

        let engine = manager.connect().await.unwrap();
        let docs = engine.list_documents(&acme()).await.unwrap();
        assert_eq!(docs[0].metadata, json!({ "title": "report.md" }));
        let hits = engine
            .direct_similarity(&acme(), &vec![0.0; 32], &[], -1.0)
            .await
            .unwrap();
        assert!(hits[0].chunk.page_content.contains("sourceDocument: report.md"));
    }
}
