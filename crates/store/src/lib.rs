//! Graph-augmented vector store.
//!
//! Documents are split into chunks, embedded, and stored per namespace in a
//! backing graph engine. After every write the namespace's vector index,
//! graph projection and KNN similarity edges are rebuilt, and searches
//! blend direct cosine similarity with similarity propagated along those
//! edges.

pub mod adapter;
pub mod cache;
pub mod connection;
pub mod embeddings;
pub mod engine;
pub mod ingest;
pub mod maintenance;
pub mod namespace;
pub mod namespace_store;
pub mod search;
pub mod splitter;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use adapter::{GraphVectorStore, GraphVectorStoreBuilder};
pub use maintenance::MaintenanceReport;
pub use namespace::Namespace;
pub use search::{SearchRequest, SearchResult, SourceDocument};
pub use types::{
    AddDocumentOutcome, ChunkRecord, DeleteNamespaceOutcome, DocumentInput, DocumentSummary,
    Heartbeat, NamespaceStats, OperationError, Outcome,
};
