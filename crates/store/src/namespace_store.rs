//! Namespace-scoped chunk CRUD.
//!
//! Every call opens its own session and drops it on return, error or not.

use crate::connection::ConnectionManager;
use crate::namespace::Namespace;
use crate::types::{ChunkRecord, DocumentSummary, NamespaceStats};
use std::sync::Arc;
use vecgraph_core::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct NamespaceStore {
    connections: Arc<ConnectionManager>,
}

impl NamespaceStore {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    /// True iff the namespace holds at least one chunk.
    pub async fn exists(&self, namespace: &Namespace) -> AppResult<bool> {
        Ok(self.count(namespace).await? > 0)
    }

    pub async fn count(&self, namespace: &Namespace) -> AppResult<u64> {
        let session = self.connections.session().await?;
        session.engine().count_chunks(namespace).await
    }

    pub async fn insert(&self, namespace: &Namespace, chunk: ChunkRecord) -> AppResult<()> {
        self.insert_all(namespace, &[chunk]).await
    }

    /// Write a batch of chunks in one transaction.
    ///
    /// All vectors must share one length, and it must match the dimension
    /// already stored in the namespace.
    pub async fn insert_all(&self, namespace: &Namespace, chunks: &[ChunkRecord]) -> AppResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let session = self.connections.session().await?;
        let engine = session.engine();

        if let Some(dimension) = batch_dimension(chunks)? {
            if let Some(existing) = engine.sample_dimension(namespace).await? {
                if existing != dimension {
                    return Err(AppError::Embedding(format!(
                        "namespace '{}' stores {}-dimensional vectors, batch has {}",
                        namespace, existing, dimension
                    )));
                }
            }
        }

        engine.insert_chunks(namespace, chunks).await?;
        tracing::debug!("[namespace] inserted {} chunks into '{}'", chunks.len(), namespace);
        Ok(())
    }

    pub async fn delete_by_document(&self, namespace: &Namespace, doc_id: &str) -> AppResult<u64> {
        let session = self.connections.session().await?;
        let deleted = session.engine().delete_document(namespace, doc_id).await?;
        tracing::debug!(
            "[namespace] deleted {} chunks of document '{}' from '{}'",
            deleted,
            doc_id,
            namespace
        );
        Ok(deleted)
    }

    pub async fn delete_namespace(&self, namespace: &Namespace) -> AppResult<u64> {
        let session = self.connections.session().await?;
        session.engine().delete_namespace(namespace).await
    }

    /// Remove every chunk, edge and derived structure in every namespace.
    pub async fn reset_all(&self) -> AppResult<()> {
        let session = self.connections.session().await?;
        session.engine().delete_all().await?;
        tracing::warn!("[namespace] store reset: all namespaces removed");
        Ok(())
    }

    pub async fn list_documents(&self, namespace: &Namespace) -> AppResult<Vec<DocumentSummary>> {
        let session = self.connections.session().await?;
        session.engine().list_documents(namespace).await
    }

    pub async fn list_namespaces(&self) -> AppResult<Vec<Namespace>> {
        let session = self.connections.session().await?;
        session.engine().list_namespaces().await
    }

    pub async fn stats(&self, namespace: &Namespace) -> AppResult<NamespaceStats> {
        let session = self.connections.session().await?;
        let engine = session.engine();

        let vector_count = engine.count_chunks(namespace).await?;
        let document_count = engine.list_documents(namespace).await?.len() as u64;
        let dimension = engine.sample_dimension(namespace).await?;
        let edge_count = engine.edge_count(namespace).await?;

        Ok(NamespaceStats {
            namespace: namespace.to_string(),
            vector_count,
            document_count,
            dimension,
            edge_count,
        })
    }
}

/// Common vector length of a batch, or `None` if no chunk is embedded.
fn batch_dimension(chunks: &[ChunkRecord]) -> AppResult<Option<usize>> {
    let mut dimension = None;
    for chunk in chunks {
        let Some(len) = chunk.dimension() else {
            continue;
        };
        if len == 0 {
            return Err(AppError::Embedding(format!(
                "chunk {} has an empty embedding",
                chunk.chunk_id
            )));
        }
        match dimension {
            None => dimension = Some(len),
            Some(expected) if expected != len => {
                return Err(AppError::Embedding(format!(
                    "batch mixes {}- and {}-dimensional vectors",
                    expected, len
                )));
            }
            Some(_) => {}
        }
    }
    Ok(dimension)
}
