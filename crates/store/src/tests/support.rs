//! Shared test doubles.

use crate::connection::ConnectionManager;
use crate::embeddings::EmbeddingProvider;
use crate::engine::{SqliteConnector, SQLITE_BACKEND};
use crate::splitter::{SplitConfig, TextSplitter};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vecgraph_core::config::StoreConfig;
use vecgraph_core::{AppError, AppResult};

/// Fresh in-memory store connection.
pub(crate) fn memory_manager() -> Arc<ConnectionManager> {
    Arc::new(
        ConnectionManager::new(
            StoreConfig::new(SQLITE_BACKEND, "sqlite::memory:"),
            Arc::new(SqliteConnector),
        )
        .unwrap(),
    )
}

/// Splits on blank lines so tests control chunk boundaries exactly.
#[derive(Debug)]
pub(crate) struct ParagraphSplitter;

impl TextSplitter for ParagraphSplitter {
    fn split(&self, text: &str, _config: &SplitConfig) -> AppResult<Vec<String>> {
        Ok(text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Returns hand-picked vectors for known texts and fails on anything else.
#[derive(Debug)]
pub(crate) struct StaticEmbedder {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    pub(crate) fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Number of `embed_batch` calls so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for StaticEmbedder {
    fn provider_name(&self) -> &str {
        "static"
    }

    fn model_name(&self) -> &str {
        "fixture"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        texts
            .iter()
            .map(|text| {
                self.vectors
                    .get(text)
                    .cloned()
                    .ok_or_else(|| AppError::Embedding(format!("no fixture vector for {:?}", text)))
            })
            .collect()
    }
}

/// Always returns an empty batch.
#[derive(Debug)]
pub(crate) struct EmptyEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for EmptyEmbedder {
    fn provider_name(&self) -> &str {
        "empty"
    }

    fn model_name(&self) -> &str {
        "none"
    }

    fn dimensions(&self) -> usize {
        0
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(Vec::new())
    }
}
