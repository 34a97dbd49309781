//! Store type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vecgraph_core::AppError;

/// Metadata key that carries a copy of the chunk text for downstream consumers.
pub const TEXT_METADATA_KEY: &str = "text";

/// An embedded fragment of a source document, as persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    /// Unique chunk identifier (UUID v4, generated at ingestion)
    pub chunk_id: String,

    /// Parent document identifier, shared by all chunks of a document
    pub doc_id: String,

    /// Chunk text
    pub page_content: String,

    /// Document- and chunk-level attributes, stored as an opaque JSON blob
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Embedding vector; uniform dimension within a namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ChunkRecord {
    /// Create a chunk with a freshly generated id.
    pub fn new(
        doc_id: impl Into<String>,
        page_content: impl Into<String>,
        metadata: serde_json::Value,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            chunk_id: uuid::Uuid::new_v4().to_string(),
            doc_id: doc_id.into(),
            page_content: page_content.into(),
            metadata,
            embedding: Some(embedding),
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.embedding.as_ref().map(Vec::len)
    }
}

/// A document already reduced to text and metadata, ready for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub doc_id: String,
    pub page_content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DocumentInput {
    pub fn new(doc_id: impl Into<String>, page_content: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            page_content: page_content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Add a document-level metadata attribute.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One document stored in a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub doc_id: String,
    pub chunk_count: u64,
    /// Metadata of the document's first chunk, without the duplicated chunk text
    pub metadata: serde_json::Value,
    pub first_ingested_at: Option<DateTime<Utc>>,
}

/// Statistics for a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    pub namespace: String,
    pub vector_count: u64,
    pub document_count: u64,
    pub dimension: Option<usize>,
    pub edge_count: u64,
}

/// Outcome of adding a document to a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDocumentOutcome {
    pub vectorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of chunks written for the document
    #[serde(default)]
    pub chunk_count: usize,
    /// Whether the chunks came from the chunk cache
    #[serde(default)]
    pub from_cache: bool,
}

impl AddDocumentOutcome {
    pub fn vectorized(chunk_count: usize, from_cache: bool) -> Self {
        Self {
            vectorized: true,
            error: None,
            chunk_count,
            from_cache,
        }
    }

    /// A no-op outcome (e.g. empty document), not an error.
    pub fn skipped() -> Self {
        Self {
            vectorized: false,
            error: None,
            chunk_count: 0,
            from_cache: false,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            vectorized: false,
            error: Some(error.into()),
            chunk_count: 0,
            from_cache: false,
        }
    }
}

/// Liveness probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub heartbeat: bool,
}

/// Structured error returned at the adapter boundary instead of a raised error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    pub error: String,
}

impl From<AppError> for OperationError {
    fn from(err: AppError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Result type of the public adapter operations.
pub type Outcome<T> = Result<T, OperationError>;

/// Outcome of deleting a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNamespaceOutcome {
    pub deleted_count: u64,
    pub message: String,
}
