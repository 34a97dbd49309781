//! Hybrid similarity search.
//!
//! Direct cosine similarity to the query selects candidates; the KNN graph
//! around each candidate adds a bonus for chunks that sit in a dense
//! cluster of mutually similar chunks. Every returned score, direct and
//! combined, is at or above the request threshold.

pub mod scoring;
pub mod types;

pub use scoring::{combined_score, path_similarity, RankedChunk, MAX_KNN_DEPTH};
pub use types::{SearchRequest, SearchResult, SourceDocument};

use crate::connection::ConnectionManager;
use crate::embeddings::EmbeddingProvider;
use crate::namespace::Namespace;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info_span, Instrument};
use vecgraph_core::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct HybridSearch {
    connections: Arc<ConnectionManager>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl HybridSearch {
    pub fn new(connections: Arc<ConnectionManager>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            connections,
            embedder,
        }
    }

    /// Run a search. Failures come back inside the result, never as `Err`.
    pub async fn search(&self, request: &SearchRequest) -> SearchResult {
        let span = info_span!("search", namespace = %request.namespace, top_n = request.top_n);
        match self.execute(request).instrument(span).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "[search] query on '{}' failed: {}",
                    request.namespace, e
                );
                SearchResult::failed(e.to_string())
            }
        }
    }

    async fn execute(&self, request: &SearchRequest) -> AppResult<SearchResult> {
        let namespace = Namespace::parse(&request.namespace)?;
        let threshold = request.similarity_threshold;
        if !threshold.is_finite() {
            return Err(AppError::Query(format!(
                "similarity threshold must be a finite number, got {}",
                threshold
            )));
        }

        let session = self.connections.session().await?;
        let engine = session.engine();

        if engine.count_chunks(&namespace).await? == 0 {
            return Ok(SearchResult::empty(format!(
                "Namespace '{}' has no documents to search",
                namespace
            )));
        }

        let query = self.embedder.embed(&request.input).await?;
        if let Some(dimension) = engine.sample_dimension(&namespace).await? {
            if dimension != query.len() {
                return Err(AppError::Query(format!(
                    "query vector has {} dimensions but namespace '{}' stores {}",
                    query.len(),
                    namespace,
                    dimension
                )));
            }
        }

        let direct = engine
            .direct_similarity(&namespace, &query, &request.filter_doc_ids, threshold)
            .await?;
        if direct.is_empty() {
            return Ok(SearchResult::empty(format!(
                "No chunks in '{}' scored at or above the similarity threshold of {:.2}",
                namespace, threshold
            )));
        }

        let depth = request.knn_depth.min(MAX_KNN_DEPTH);
        let paths = if depth > 0 {
            let ids: Vec<String> = direct.iter().map(|s| s.chunk.chunk_id.clone()).collect();
            engine
                .traverse_similarity(&namespace, &ids, depth, threshold)
                .await?
        } else {
            HashMap::new()
        };

        let candidates: Vec<RankedChunk> = direct
            .into_iter()
            .map(|scored| {
                let (graph_similarity, score) = if depth == 0 {
                    (0.0, scored.similarity)
                } else {
                    let graph = paths
                        .get(&scored.chunk.chunk_id)
                        .map(|p| scoring::average_path_similarity(p))
                        .unwrap_or(0.0);
                    (graph, combined_score(scored.similarity, graph))
                };
                RankedChunk {
                    chunk: scored.chunk,
                    direct_similarity: scored.similarity,
                    graph_similarity,
                    score,
                }
            })
            .filter(|candidate| candidate.score >= threshold)
            .collect();
        if candidates.is_empty() {
            return Ok(SearchResult::empty(format!(
                "No chunks in '{}' kept a combined score at or above the similarity threshold of {:.2}",
                namespace, threshold
            )));
        }

        let ranked = scoring::rank(candidates, request.top_n);
        debug!(
            "[search] '{}' returned {} results (depth {}, threshold {:.2})",
            namespace,
            ranked.len(),
            depth,
            threshold
        );

        Ok(into_result(ranked))
    }
}

fn into_result(ranked: Vec<RankedChunk>) -> SearchResult {
    let mut result = SearchResult::default();
    for hit in ranked {
        result.scores.push(hit.score);
        result.sources.push(SourceDocument {
            chunk_id: hit.chunk.chunk_id,
            doc_id: hit.chunk.doc_id,
            metadata: hit.chunk.metadata,
            score: hit.score,
            direct_similarity: hit.direct_similarity,
            graph_similarity: hit.graph_similarity,
        });
        result.context_texts.push(hit.chunk.page_content);
    }
    if result.sources.is_empty() {
        result.message = Some("No results requested (topN is 0)".to_string());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{SqliteConnector, SQLITE_BACKEND};
    use crate::maintenance::IndexMaintainer;
    use crate::namespace_store::NamespaceStore;
    use crate::tests::support::StaticEmbedder;
    use crate::types::ChunkRecord;
    use serde_json::json;
    use vecgraph_core::config::StoreConfig;

    struct Fixture {
        store: NamespaceStore,
        maintainer: IndexMaintainer,
        embedder: Arc<StaticEmbedder>,
        search: HybridSearch,
    }

    fn fixture() -> Fixture {
        let manager = Arc::new(
            ConnectionManager::new(
                StoreConfig::new(SQLITE_BACKEND, "sqlite::memory:"),
                Arc::new(SqliteConnector),
            )
            .unwrap(),
        );
        let embedder = Arc::new(
            StaticEmbedder::new(3)
                .with("finance", vec![1.0, 0.0, 0.0])
                .with("hiking", vec![0.0, 0.0, 1.0]),
        );
        Fixture {
            store: NamespaceStore::new(Arc::clone(&manager)),
            maintainer: IndexMaintainer::new(Arc::clone(&manager), 3),
            search: HybridSearch::new(Arc::clone(&manager), embedder.clone()),
            embedder,
        }
    }

    fn chunk(id: &str, doc: &str, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            chunk_id: id.to_string(),
            doc_id: doc.to_string(),
            page_content: format!("text {}", id),
            metadata: json!({ "title": doc }),
            embedding: Some(embedding),
        }
    }

    async fn seed(f: &Fixture) {
        let acme = Namespace::parse("acme").unwrap();
        f.store
            .insert_all(
                &acme,
                &[
                    chunk("c1", "d1", vec![0.95, 0.31, 0.0]),
                    chunk("c2", "d1", vec![0.90, 0.43, 0.0]),
                    chunk("c3", "d2", vec![0.80, 0.60, 0.0]),
                    chunk("c4", "d3", vec![0.0, 0.20, 0.98]),
                ],
            )
            .await
            .unwrap();
        f.maintainer.run(&acme).await;
    }

    #[tokio::test]
    async fn test_empty_namespace_skips_embedder() {
        let f = fixture();
        let result = f.search.search(&SearchRequest::new("acme", "finance")).await;

        assert!(result.is_empty());
        assert!(result.context_texts.is_empty() && result.scores.is_empty());
        assert!(result.message.is_some());
        assert!(result.error.is_none());
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_results_are_ranked_and_bounded() {
        let f = fixture();
        seed(&f).await;

        let result = f
            .search
            .search(&SearchRequest::new("acme", "finance").threshold(0.5).top_n(2))
            .await;

        assert!(result.error.is_none());
        assert_eq!(result.len(), 2);
        assert!(result.scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(result.sources.iter().all(|s| s.direct_similarity >= 0.5));
        assert!(result.sources.iter().all(|s| s.doc_id != "d3"));
        assert_eq!(result.context_texts.len(), result.sources.len());
    }

    #[tokio::test]
    async fn test_graph_term_contributes() {
        let f = fixture();
        seed(&f).await;

        let result = f
            .search
            .search(&SearchRequest::new("acme", "finance").threshold(0.5).top_n(4))
            .await;
        let top = &result.sources[0];
        assert!(top.graph_similarity > 0.0);
        assert!((top.score - combined_score(top.direct_similarity, top.graph_similarity)).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_depth_zero_is_plain_cosine() {
        let f = fixture();
        seed(&f).await;

        let result = f
            .search
            .search(&SearchRequest::new("acme", "finance").threshold(0.5).knn_depth(0))
            .await;
        assert_eq!(result.sources[0].chunk_id, "c1");
        for source in &result.sources {
            assert_eq!(source.score, source.direct_similarity);
            assert_eq!(source.graph_similarity, 0.0);
        }
    }

    #[tokio::test]
    async fn test_excluded_documents() {
        let f = fixture();
        seed(&f).await;

        let result = f
            .search
            .search(
                &SearchRequest::new("acme", "finance")
                    .threshold(0.1)
                    .top_n(10)
                    .exclude_documents(vec!["d1".to_string()]),
            )
            .await;
        assert!(result.sources.iter().all(|s| s.doc_id != "d1"));
        assert!(!result.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_above_threshold_has_message() {
        let f = fixture();
        seed(&f).await;

        let result = f
            .search
            .search(&SearchRequest::new("acme", "finance").threshold(0.999))
            .await;
        assert!(result.is_empty());
        assert!(result.error.is_none());
        assert!(result.message.unwrap().contains("threshold"));
    }

    #[tokio::test]
    async fn test_lone_chunk_below_threshold_after_blending_is_dropped() {
        let manager = Arc::new(
            ConnectionManager::new(
                StoreConfig::new(SQLITE_BACKEND, "sqlite::memory:"),
                Arc::new(SqliteConnector),
            )
            .unwrap(),
        );
        let embedder = Arc::new(StaticEmbedder::new(2).with("east", vec![1.0, 0.0]));
        let search = HybridSearch::new(Arc::clone(&manager), embedder);
        let acme = Namespace::parse("acme").unwrap();
        NamespaceStore::new(Arc::clone(&manager))
            .insert(&acme, chunk("c1", "d1", vec![0.12, 0.99]))
            .await
            .unwrap();
        IndexMaintainer::new(Arc::clone(&manager), 3).run(&acme).await;

        // Direct similarity is about 0.12, but with no neighbors the blended score is about 0.084
        let result = search
            .search(&SearchRequest::new("acme", "east").threshold(0.1))
            .await;
        assert!(result.error.is_none());
        assert!(result.is_empty(), "scores: {:?}", result.scores);
        assert!(result.message.unwrap().contains("threshold"));

        // Plain cosine ranking keeps it
        let result = search
            .search(&SearchRequest::new("acme", "east").threshold(0.1).knn_depth(0))
            .await;
        assert_eq!(result.len(), 1);
        assert!(result.scores[0] >= 0.1);
    }

    #[tokio::test]
    async fn test_scores_never_fall_below_threshold() {
        let f = fixture();
        seed(&f).await;

        for step in 0..=10 {
            let threshold = step as f32 / 10.0;
            let result = f
                .search
                .search(&SearchRequest::new("acme", "finance").threshold(threshold).top_n(10))
                .await;
            assert!(result.scores.iter().all(|s| *s >= threshold), "threshold {}", threshold);
            assert!(result.sources.iter().all(|s| s.direct_similarity >= threshold));
        }
    }

    #[tokio::test]
    async fn test_raising_threshold_never_adds_results() {
        let f = fixture();
        seed(&f).await;

        let mut previous = usize::MAX;
        for step in 0..=10 {
            let threshold = step as f32 / 10.0;
            let result = f
                .search
                .search(&SearchRequest::new("acme", "finance").threshold(threshold).top_n(10))
                .await;
            assert!(result.len() <= previous, "count grew at threshold {}", threshold);
            previous = result.len();
        }
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_structured_error() {
        let f = fixture();
        let acme = Namespace::parse("acme").unwrap();
        f.store.insert(&acme, chunk("c1", "d1", vec![1.0, 0.0])).await.unwrap();

        let result = f.search.search(&SearchRequest::new("acme", "finance")).await;
        assert!(result.error.unwrap().contains("dimensions"));
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_namespace_is_structured_error() {
        let f = fixture();
        let result = f.search.search(&SearchRequest::new("bad name", "finance")).await;
        assert!(result.error.is_some());
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_embedder_failure_is_structured_error() {
        let f = fixture();
        seed(&f).await;

        let result = f.search.search(&SearchRequest::new("acme", "unknown text")).await;
        assert!(result.error.is_some());
        assert!(result.sources.is_empty());
    }
}
