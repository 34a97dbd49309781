//! Public adapter surface.
//!
//! [`GraphVectorStore`] composes the connection manager, namespace store,
//! maintainer, hybrid search and ingestion pipeline. Apart from
//! `initialize`, operations never return `AppError`: failures are logged
//! with their category and handed back as structured outcomes.

use crate::cache::{ChunkCache, FileChunkCache};
use crate::connection::ConnectionManager;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::engine::{Connector, SqliteConnector};
use crate::ingest::IngestionOrchestrator;
use crate::maintenance::{IndexMaintainer, MaintenanceReport, DEFAULT_KNN_K};
use crate::namespace::Namespace;
use crate::namespace_store::NamespaceStore;
use crate::search::{HybridSearch, SearchRequest, SearchResult};
use crate::splitter::{SemanticSplitter, SplitConfig, TextSplitter};
use crate::types::{
    AddDocumentOutcome, DeleteNamespaceOutcome, DocumentInput, DocumentSummary, Heartbeat,
    NamespaceStats, OperationError, Outcome,
};
use std::sync::Arc;
use tracing::{error, info};
use vecgraph_core::config::{SearchDefaults, StoreConfig};
use vecgraph_core::{AppConfig, AppError, AppResult};

/// Graph-augmented vector store over a backing graph engine.
#[derive(Debug)]
pub struct GraphVectorStore {
    connections: Arc<ConnectionManager>,
    store: NamespaceStore,
    maintainer: IndexMaintainer,
    search: HybridSearch,
    ingest: IngestionOrchestrator,
    search_defaults: SearchDefaults,
}

/// Builder for [`GraphVectorStore`].
pub struct GraphVectorStoreBuilder {
    store_config: StoreConfig,
    connector: Arc<dyn Connector>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    splitter: Arc<dyn TextSplitter>,
    split_config: SplitConfig,
    batch_size: usize,
    cache: Option<Arc<dyn ChunkCache>>,
    knn_k: usize,
    search_defaults: SearchDefaults,
}

impl GraphVectorStoreBuilder {
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn splitter(mut self, splitter: Arc<dyn TextSplitter>, config: SplitConfig) -> Self {
        self.splitter = splitter;
        self.split_config = config;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ChunkCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn knn_k(mut self, k: usize) -> Self {
        self.knn_k = k;
        self
    }

    pub fn search_defaults(mut self, defaults: SearchDefaults) -> Self {
        self.search_defaults = defaults;
        self
    }

    /// Validate the store settings and assemble the adapter. No I/O.
    pub fn build(self) -> AppResult<GraphVectorStore> {
        let embedder = self
            .embedder
            .ok_or_else(|| AppError::Config("an embedding provider is required".to_string()))?;

        let connections = Arc::new(ConnectionManager::new(self.store_config, self.connector)?);
        let store = NamespaceStore::new(Arc::clone(&connections));
        let maintainer = IndexMaintainer::new(Arc::clone(&connections), self.knn_k);
        let search = HybridSearch::new(Arc::clone(&connections), Arc::clone(&embedder));

        let mut ingest = IngestionOrchestrator::new(
            store.clone(),
            maintainer.clone(),
            embedder,
            self.splitter,
            self.split_config,
        )
        .with_batch_size(self.batch_size);
        if let Some(cache) = self.cache {
            ingest = ingest.with_cache(cache);
        }

        Ok(GraphVectorStore {
            connections,
            store,
            maintainer,
            search,
            ingest,
            search_defaults: self.search_defaults,
        })
    }
}

impl GraphVectorStore {
    pub fn builder(store_config: StoreConfig) -> GraphVectorStoreBuilder {
        let defaults = vecgraph_core::config::SplitterConfig::default();
        GraphVectorStoreBuilder {
            store_config,
            connector: Arc::new(SqliteConnector),
            embedder: None,
            splitter: Arc::new(SemanticSplitter),
            split_config: SplitConfig::from(&defaults),
            batch_size: vecgraph_core::config::EmbeddingConfig::default().batch_size,
            cache: None,
            knn_k: DEFAULT_KNN_K,
            search_defaults: SearchDefaults::default(),
        }
    }

    /// Assemble the adapter from application configuration.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let embedder = create_provider(&config.embedding).await?;

        let mut builder = Self::builder(config.store_config())
            .embedder(embedder)
            .splitter(Arc::new(SemanticSplitter), SplitConfig::from(&config.splitter))
            .batch_size(config.embedding.batch_size)
            .knn_k(config.maintenance.knn_k)
            .search_defaults(config.search.clone());

        if let Some(dir) = config.cache_dir() {
            builder = builder.cache(Arc::new(FileChunkCache::new(dir)));
        }

        builder.build()
    }

    /// Connect and run a maintenance pass over every namespace.
    ///
    /// Configuration and connection failures are returned; maintenance
    /// failures are only reported.
    pub async fn initialize(&self) -> AppResult<Vec<MaintenanceReport>> {
        self.connections.connect().await?;
        let reports = self.maintainer.run_all().await?;
        info!(
            "[connection] store ready, {} namespaces maintained",
            reports.len()
        );
        Ok(reports)
    }

    pub async fn disconnect(&self) -> AppResult<()> {
        self.connections.disconnect().await
    }

    pub async fn heartbeat(&self) -> Heartbeat {
        let alive = match self.connections.session().await {
            Ok(session) => session.engine().ping().await.is_ok(),
            Err(e) => {
                error!("[connection] heartbeat failed: {}", e);
                false
            }
        };
        Heartbeat { heartbeat: alive }
    }

    pub async fn has_namespace(&self, namespace: &str) -> Outcome<bool> {
        let result = match Namespace::parse(namespace) {
            Ok(ns) => self.store.exists(&ns).await,
            Err(e) => Err(e),
        };
        outcome("namespace", "hasNamespace", result)
    }

    pub async fn namespace_count(&self, namespace: &str) -> Outcome<u64> {
        let result = match Namespace::parse(namespace) {
            Ok(ns) => self.store.count(&ns).await,
            Err(e) => Err(e),
        };
        outcome("namespace", "namespaceCount", result)
    }

    pub async fn namespace_stats(&self, namespace: &str) -> Outcome<NamespaceStats> {
        let result = match Namespace::parse(namespace) {
            Ok(ns) => self.store.stats(&ns).await,
            Err(e) => Err(e),
        };
        outcome("namespace", "namespaceStats", result)
    }

    pub async fn list_documents(&self, namespace: &str) -> Outcome<Vec<DocumentSummary>> {
        let result = match Namespace::parse(namespace) {
            Ok(ns) => self.store.list_documents(&ns).await,
            Err(e) => Err(e),
        };
        outcome("namespace", "listDocuments", result)
    }

    pub async fn list_namespaces(&self) -> Outcome<Vec<String>> {
        let result = self
            .store
            .list_namespaces()
            .await
            .map(|names| names.into_iter().map(String::from).collect());
        outcome("namespace", "listNamespaces", result)
    }

    pub async fn add_document_to_namespace(
        &self,
        namespace: &str,
        document: DocumentInput,
        cache_key: Option<&str>,
    ) -> AddDocumentOutcome {
        match Namespace::parse(namespace) {
            Ok(ns) => self.ingest.add_document(&ns, document, cache_key).await,
            Err(e) => {
                error!("[ingest] rejected document '{}': {}", document.doc_id, e);
                AddDocumentOutcome::failed(e.to_string())
            }
        }
    }

    /// Delete a document's chunks and, if any were removed, refresh the graph.
    ///
    /// Returns whether anything was deleted.
    pub async fn delete_document_from_namespace(&self, namespace: &str, doc_id: &str) -> Outcome<bool> {
        let result = self.delete_document(namespace, doc_id).await;
        outcome("namespace", "deleteDocumentFromNamespace", result)
    }

    pub async fn delete_namespace(&self, namespace: &str) -> Outcome<DeleteNamespaceOutcome> {
        let result = self.drop_namespace(namespace).await;
        outcome("namespace", "deleteNamespace", result)
    }

    /// A request pre-filled with the configured search defaults.
    pub fn search_request(&self, namespace: &str, input: &str) -> SearchRequest {
        SearchRequest::with_defaults(namespace, input, &self.search_defaults)
    }

    pub async fn perform_similarity_search(&self, request: &SearchRequest) -> SearchResult {
        self.search.search(request).await
    }

    pub async fn maintain_namespace(&self, namespace: &str) -> Outcome<MaintenanceReport> {
        let result = match Namespace::parse(namespace) {
            Ok(ns) => Ok(self.maintainer.run(&ns).await),
            Err(e) => Err(e),
        };
        outcome("maintenance", "maintainNamespace", result)
    }

    /// Remove everything in every namespace.
    pub async fn reset(&self) -> Outcome<()> {
        let result = self.store.reset_all().await;
        outcome("namespace", "reset", result)
    }

    async fn delete_document(&self, namespace: &str, doc_id: &str) -> AppResult<bool> {
        let ns = Namespace::parse(namespace)?;
        let deleted = self.store.delete_by_document(&ns, doc_id).await?;
        if deleted > 0 {
            self.maintainer.run(&ns).await;
        }
        Ok(deleted > 0)
    }

    async fn drop_namespace(&self, namespace: &str) -> AppResult<DeleteNamespaceOutcome> {
        let ns = Namespace::parse(namespace)?;
        let deleted_count = self.store.delete_namespace(&ns).await?;
        info!("[namespace] deleted '{}' ({} chunks)", ns, deleted_count);
        Ok(DeleteNamespaceOutcome {
            deleted_count,
            message: format!(
                "Namespace {} was deleted along with {} vectors.",
                ns, deleted_count
            ),
        })
    }
}

fn outcome<T>(category: &str, operation: &str, result: AppResult<T>) -> Outcome<T> {
    result.map_err(|e| {
        error!("[{}] {} failed: {}", category, operation, e);
        OperationError::from(e)
    })
}
