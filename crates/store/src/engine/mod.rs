//! Backing graph/vector engine abstraction.
//!
//! The adapter never computes similarity or KNN graphs itself; it issues
//! requests through [`GraphEngine`]. A [`Connector`] turns validated store
//! settings into a live engine handle.

pub mod sqlite;

pub use sqlite::{SqliteConnector, SqliteGraphEngine, SQLITE_BACKEND};

use crate::namespace::Namespace;
use crate::types::{ChunkRecord, DocumentSummary};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use vecgraph_core::config::StoreConfig;
use vecgraph_core::AppResult;

/// Property holding chunk embeddings.
pub const EMBEDDING_PROPERTY: &str = "embedding";

/// Similarity function used by a vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    Cosine,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cosine" => Some(SimilarityMetric::Cosine),
            _ => None,
        }
    }
}

/// Definition of a vector index over chunk embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndexDef {
    pub name: String,
    pub namespace: Namespace,
    pub property: String,
    pub dimension: usize,
    pub metric: SimilarityMetric,
}

impl VectorIndexDef {
    /// Cosine index over the embedding property of a namespace.
    pub fn cosine(namespace: &Namespace, dimension: usize) -> Self {
        Self {
            name: namespace.index_name(),
            namespace: namespace.clone(),
            property: EMBEDDING_PROPERTY.to_string(),
            dimension,
            metric: SimilarityMetric::Cosine,
        }
    }
}

/// Result of a vector index creation request.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexStatus {
    Created,
    /// An equivalent index already exists; treated as success.
    AlreadyPresent,
    /// An index with the same name but a different definition exists.
    Conflicting { existing: VectorIndexDef },
}

/// A materialized graph projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInfo {
    pub name: String,
    pub namespace: Namespace,
    pub node_count: usize,
}

/// Statistics from a KNN edge computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnnStats {
    pub nodes_compared: usize,
    pub edges_written: usize,
}

/// A weighted similarity relationship between two chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityEdge {
    pub source_id: String,
    pub target_id: String,
    pub similarity: f32,
}

/// A chunk with its cosine similarity to a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// The chunk, without its embedding
    pub chunk: ChunkRecord,
    pub similarity: f32,
}

/// A neighbor reached from a start node, with the edge weights along the path.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborPath {
    pub node_id: String,
    pub weights: Vec<f32>,
}

/// Request surface of a graph-capable vector store.
///
/// Every method is one logical round trip. Implementations own cosine
/// similarity, projection storage and KNN computation.
#[async_trait::async_trait]
pub trait GraphEngine: Send + Sync + fmt::Debug {
    /// Backend identity (matches the connector's).
    fn backend_name(&self) -> &str;

    /// Cheap liveness probe.
    async fn ping(&self) -> AppResult<()>;

    /// Release engine resources. Further requests may fail.
    async fn close(&self) -> AppResult<()> {
        Ok(())
    }

    /// Namespaces that currently hold at least one chunk.
    async fn list_namespaces(&self) -> AppResult<Vec<Namespace>>;

    async fn count_chunks(&self, namespace: &Namespace) -> AppResult<u64>;

    /// Insert chunks atomically: either all are written or none.
    async fn insert_chunks(&self, namespace: &Namespace, chunks: &[ChunkRecord]) -> AppResult<()>;

    /// Remove every chunk of `doc_id` and the edges touching them.
    async fn delete_document(&self, namespace: &Namespace, doc_id: &str) -> AppResult<u64>;

    /// Remove every chunk, edge, index and projection of a namespace.
    async fn delete_namespace(&self, namespace: &Namespace) -> AppResult<u64>;

    /// Remove everything regardless of namespace.
    async fn delete_all(&self) -> AppResult<()>;

    async fn list_documents(&self, namespace: &Namespace) -> AppResult<Vec<DocumentSummary>>;

    /// Embedding length of one chunk that has an embedding, if any.
    async fn sample_dimension(&self, namespace: &Namespace) -> AppResult<Option<usize>>;

    async fn describe_vector_index(&self, name: &str) -> AppResult<Option<VectorIndexDef>>;

    async fn create_vector_index(&self, def: &VectorIndexDef) -> AppResult<IndexStatus>;

    async fn drop_vector_index(&self, name: &str) -> AppResult<bool>;

    async fn projection_exists(&self, name: &str) -> AppResult<bool>;

    async fn drop_projection(&self, name: &str) -> AppResult<bool>;

    /// Materialize a projection of all embedded chunks in a namespace.
    ///
    /// Fails if a projection with the same name already exists.
    async fn project_graph(&self, name: &str, namespace: &Namespace) -> AppResult<ProjectionInfo>;

    /// Drop the namespace's similarity edges and write the top-`k`
    /// cosine neighbors of every node in the projection.
    async fn replace_knn_edges(&self, projection: &str, k: usize) -> AppResult<KnnStats>;

    async fn edge_count(&self, namespace: &Namespace) -> AppResult<u64>;

    async fn similarity_edges(&self, namespace: &Namespace) -> AppResult<Vec<SimilarityEdge>>;

    /// Chunks whose cosine similarity to `query` is at least `threshold`,
    /// skipping chunks of the excluded documents.
    async fn direct_similarity(
        &self,
        namespace: &Namespace,
        query: &[f32],
        exclude_doc_ids: &[String],
        threshold: f32,
    ) -> AppResult<Vec<ScoredChunk>>;

    /// All simple paths of up to `max_depth` hops from each start node,
    /// following edges in either direction whose weight is at least
    /// `min_weight`.
    async fn traverse_similarity(
        &self,
        namespace: &Namespace,
        start_ids: &[String],
        max_depth: usize,
        min_weight: f32,
    ) -> AppResult<HashMap<String, Vec<NeighborPath>>>;
}

/// Factory for engine handles.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// Backend identity the store configuration must select.
    fn backend(&self) -> &str;

    /// Reject unusable settings before any I/O.
    fn validate(&self, config: &StoreConfig) -> AppResult<()> {
        config.validate(self.backend())
    }

    /// Open the physical connection.
    async fn connect(&self, config: &StoreConfig) -> AppResult<Arc<dyn GraphEngine>>;
}
