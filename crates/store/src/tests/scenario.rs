use crate::engine::SQLITE_BACKEND;
use crate::splitter::SplitConfig;
use crate::tests::support::{ParagraphSplitter, StaticEmbedder};
use crate::{DocumentInput, GraphVectorStore, SearchRequest};
use std::sync::Arc;
use vecgraph_core::config::StoreConfig;

const QUARTERLY: &str = "Revenue grew in the third quarter.\n\nMargins held steady across regions.\n\nHeadcount stayed flat.";
const QUERY: &str = "how did margins develop";

fn embedder() -> Arc<StaticEmbedder> {
    Arc::new(
        StaticEmbedder::new(3)
            .with("Revenue grew in the third quarter.", vec![1.0, 0.0, 0.0])
            .with("Margins held steady across regions.", vec![0.6, 0.8, 0.0])
            .with("Headcount stayed flat.", vec![0.0, 0.6, 0.8])
            .with("Trail maps for the northern ridge.", vec![0.0, 0.0, 1.0])
            .with(QUERY, vec![0.3, 0.95, 0.1]),
    )
}

fn store(embedder: Arc<StaticEmbedder>) -> GraphVectorStore {
    GraphVectorStore::builder(StoreConfig::new(SQLITE_BACKEND, "sqlite::memory:"))
        .embedder(embedder)
        .splitter(Arc::new(ParagraphSplitter), SplitConfig::new(1000, 0))
        .knn_k(5)
        .build()
        .unwrap()
}

fn quarterly(doc_id: &str) -> DocumentInput {
    DocumentInput::new(doc_id, QUARTERLY).with_metadata("title", "q3-report.txt")
}

#[tokio::test]
async fn test_add_search_delete_lifecycle() {
    let store = store(embedder());
    store.initialize().await.unwrap();

    let outcome = store.add_document_to_namespace("acme", quarterly("d1"), None).await;
    assert!(outcome.vectorized, "{:?}", outcome.error);
    assert_eq!(outcome.chunk_count, 3);
    assert_eq!(store.namespace_count("acme").await.unwrap(), 3);
    assert!(store.has_namespace("acme").await.unwrap());

    let result = store
        .perform_similarity_search(&SearchRequest::new("acme", QUERY).threshold(0.1).top_n(2))
        .await;
    assert!(result.error.is_none(), "{:?}", result.error);
    assert_eq!(result.len(), 2);
    assert_eq!(result.context_texts.len(), result.scores.len());
    assert!(result.scores.iter().all(|s| *s >= 0.1));
    assert!(result.scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(result.context_texts[0], "Margins held steady across regions.");
    assert_eq!(result.context_texts[1], "Headcount stayed flat.");

    assert!(store.delete_document_from_namespace("acme", "d1").await.unwrap());
    assert_eq!(store.namespace_count("acme").await.unwrap(), 0);
    assert!(!store.has_namespace("acme").await.unwrap());
    assert!(!store.delete_document_from_namespace("acme", "d1").await.unwrap());
}

#[tokio::test]
async fn test_graph_bonus_reflects_neighbors() {
    let store = store(embedder());
    store.add_document_to_namespace("acme", quarterly("d1"), None).await;

    let result = store
        .perform_similarity_search(&SearchRequest::new("acme", QUERY).threshold(0.1).top_n(3))
        .await;
    assert_eq!(result.len(), 3);

    // Revenue and margins are neighbors (0.6), margins and headcount (0.48).
    let margins = &result.sources[0];
    assert!((margins.graph_similarity - 0.54).abs() < 1e-3);
    assert!((margins.score - (0.7 * margins.direct_similarity + 0.3 * 0.54)).abs() < 1e-3);

    let plain = store
        .perform_similarity_search(&SearchRequest::new("acme", QUERY).threshold(0.1).knn_depth(0))
        .await;
    assert!(plain.sources.iter().all(|s| s.graph_similarity == 0.0));
    assert!(plain.sources.iter().all(|s| s.score == s.direct_similarity));
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let store = store(embedder());
    store.add_document_to_namespace("acme", quarterly("d1"), None).await;
    let outcome = store
        .add_document_to_namespace(
            "outdoors",
            DocumentInput::new("trails", "Trail maps for the northern ridge."),
            None,
        )
        .await;
    assert!(outcome.vectorized);

    assert_eq!(store.namespace_count("acme").await.unwrap(), 3);
    assert_eq!(store.namespace_count("outdoors").await.unwrap(), 1);

    let result = store
        .perform_similarity_search(&SearchRequest::new("outdoors", QUERY).threshold(0.0).top_n(10))
        .await;
    assert!(result.sources.iter().all(|s| s.doc_id == "trails"));

    let docs = store.list_documents("outdoors").await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].doc_id, "trails");

    let mut namespaces = store.list_namespaces().await.unwrap();
    namespaces.sort();
    assert_eq!(namespaces, vec!["acme".to_string(), "outdoors".to_string()]);

    // A single chunk has no neighbors, and no edge crosses into acme.
    assert_eq!(store.namespace_stats("outdoors").await.unwrap().edge_count, 0);
}

#[tokio::test]
async fn test_metadata_round_trip() {
    let store = store(embedder());
    let document = quarterly("d1").with_metadata("published", "2024-10-01");
    store.add_document_to_namespace("acme", document, None).await;

    let docs = store.list_documents("acme").await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].chunk_count, 3);
    assert_eq!(
        docs[0].metadata,
        serde_json::json!({ "title": "q3-report.txt", "published": "2024-10-01" })
    );

    let result = store
        .perform_similarity_search(&SearchRequest::new("acme", QUERY).threshold(0.1).top_n(1))
        .await;
    let source = &result.sources[0];
    assert_eq!(source.doc_id, "d1");
    assert_eq!(source.metadata["title"], "q3-report.txt");
    assert_eq!(source.metadata["published"], "2024-10-01");
    assert_eq!(source.metadata["text"], result.context_texts[0].as_str());
}

#[tokio::test]
async fn test_delete_cascades_to_edges() {
    let store = store(embedder());
    store.add_document_to_namespace("acme", quarterly("d1"), None).await;
    store
        .add_document_to_namespace(
            "acme",
            DocumentInput::new("d2", "Trail maps for the northern ridge."),
            None,
        )
        .await;
    assert!(store.namespace_stats("acme").await.unwrap().edge_count > 0);

    assert!(store.delete_document_from_namespace("acme", "d1").await.unwrap());

    let stats = store.namespace_stats("acme").await.unwrap();
    assert_eq!(stats.vector_count, 1);
    assert_eq!(stats.document_count, 1);
    assert_eq!(stats.edge_count, 0);

    let result = store
        .perform_similarity_search(&SearchRequest::new("acme", QUERY).threshold(0.0).top_n(10))
        .await;
    assert!(result.sources.iter().all(|s| s.doc_id == "d2"));
}

#[tokio::test]
async fn test_delete_namespace_and_reset() {
    let store = store(embedder());
    store.add_document_to_namespace("acme", quarterly("d1"), None).await;
    store.add_document_to_namespace("acme-eu", quarterly("d1"), None).await;
    store
        .add_document_to_namespace(
            "outdoors",
            DocumentInput::new("trails", "Trail maps for the northern ridge."),
            None,
        )
        .await;

    let deleted = store.delete_namespace("acme").await.unwrap();
    assert_eq!(deleted.deleted_count, 3);
    assert_eq!(deleted.message, "Namespace acme was deleted along with 3 vectors.");
    assert_eq!(store.namespace_count("acme").await.unwrap(), 0);
    assert_eq!(store.namespace_count("acme-eu").await.unwrap(), 3);

    store.reset().await.unwrap();
    assert!(store.list_namespaces().await.unwrap().is_empty());
    assert_eq!(store.namespace_count("outdoors").await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_embedding_leaves_namespace_untouched() {
    let store = store(embedder());
    let outcome = store
        .add_document_to_namespace("acme", DocumentInput::new("d9", "A paragraph with no fixture."), None)
        .await;
    assert!(!outcome.vectorized);
    assert!(outcome.error.is_some());
    assert_eq!(store.namespace_count("acme").await.unwrap(), 0);
}
