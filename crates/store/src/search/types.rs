//! Search request and result types.

use serde::{Deserialize, Serialize};
use vecgraph_core::config::SearchDefaults;

/// A hybrid similarity query against one namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub namespace: String,
    pub input: String,
    /// Minimum direct similarity, also the minimum edge weight followed
    pub similarity_threshold: f32,
    pub top_n: usize,
    /// Documents whose chunks are left out of the results
    #[serde(default)]
    pub filter_doc_ids: Vec<String>,
    /// Maximum hops through the KNN graph; 0 ranks by cosine alone
    pub knn_depth: usize,
}

impl SearchRequest {
    pub fn new(namespace: impl Into<String>, input: impl Into<String>) -> Self {
        Self::with_defaults(namespace, input, &SearchDefaults::default())
    }

    pub fn with_defaults(
        namespace: impl Into<String>,
        input: impl Into<String>,
        defaults: &SearchDefaults,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            input: input.into(),
            similarity_threshold: defaults.similarity_threshold,
            top_n: defaults.top_n,
            filter_doc_ids: Vec::new(),
            knn_depth: defaults.knn_depth,
        }
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn exclude_documents(mut self, doc_ids: Vec<String>) -> Self {
        self.filter_doc_ids = doc_ids;
        self
    }

    pub fn knn_depth(mut self, depth: usize) -> Self {
        self.knn_depth = depth;
        self
    }
}

/// Provenance of one search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub chunk_id: String,
    pub doc_id: String,
    /// Stored chunk metadata, as written at ingestion
    pub metadata: serde_json::Value,
    pub score: f32,
    pub direct_similarity: f32,
    pub graph_similarity: f32,
}

/// Result of a search. Always well formed; failures are reported in
/// `error`, empty results explained in `message`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub context_texts: Vec<String>,
    pub sources: Vec<SourceDocument>,
    pub scores: Vec<f32>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            message: Some(error.clone()),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
