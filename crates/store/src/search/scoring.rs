//! Hybrid score computation and ranking.

use crate::engine::NeighborPath;
use crate::types::ChunkRecord;
use std::cmp::Ordering;

/// Weight of the direct query similarity in the combined score.
pub const DIRECT_WEIGHT: f32 = 0.7;

/// Weight of the averaged graph path similarity in the combined score.
pub const GRAPH_WEIGHT: f32 = 0.3;

/// Deepest traversal accepted; larger requests are clamped.
///
/// Simple paths grow roughly with degree^depth, and a hub chunk picked as a
/// neighbor by many others has a high degree. The engine caps each walk
/// (`MAX_PATHS_PER_NODE` for SQLite).
pub const MAX_KNN_DEPTH: usize = 4;

/// Similarity carried along a path: the product of its edge weights.
pub fn path_similarity(weights: &[f32]) -> f32 {
    weights.iter().product()
}

/// Mean path similarity over all paths, 0.0 when there are none.
pub fn average_path_similarity(paths: &[NeighborPath]) -> f32 {
    if paths.is_empty() {
        return 0.0;
    }
    let total: f32 = paths.iter().map(|p| path_similarity(&p.weights)).sum();
    total / paths.len() as f32
}

pub fn combined_score(direct: f32, graph: f32) -> f32 {
    DIRECT_WEIGHT * direct + GRAPH_WEIGHT * graph
}

/// A candidate chunk with its score components.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedChunk {
    pub chunk: ChunkRecord,
    pub direct_similarity: f32,
    pub graph_similarity: f32,
    pub score: f32,
}

/// Sort by score descending and keep the first `top_n`.
///
/// Equal scores fall back to direct similarity, then chunk id.
pub fn rank(mut candidates: Vec<RankedChunk>, top_n: usize) -> Vec<RankedChunk> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.direct_similarity
                    .partial_cmp(&a.direct_similarity)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
    });
    candidates.truncate(top_n);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(id: &str, direct: f32, graph: f32) -> RankedChunk {
        RankedChunk {
            chunk: ChunkRecord {
                chunk_id: id.to_string(),
                doc_id: "doc".to_string(),
                page_content: String::new(),
                metadata: json!({}),
                embedding: None,
            },
            direct_similarity: direct,
            graph_similarity: graph,
            score: combined_score(direct, graph),
        }
    }

    #[test]
    fn test_two_hop_path_decays_multiplicatively() {
        assert!((path_similarity(&[0.9, 0.8]) - 0.72).abs() < 1e-6);
        assert_eq!(path_similarity(&[0.5]), 0.5);
    }

    #[test]
    fn test_average_without_paths_is_zero() {
        assert_eq!(average_path_similarity(&[]), 0.0);
    }

    #[test]
    fn test_average_over_paths() {
        let paths = vec![
            NeighborPath { node_id: "b".into(), weights: vec![0.9] },
            NeighborPath { node_id: "c".into(), weights: vec![0.9, 0.8] },
        ];
        assert!((average_path_similarity(&paths) - 0.81).abs() < 1e-6);
    }

    #[test]
    fn test_combined_weights() {
        assert!((combined_score(1.0, 0.0) - 0.7).abs() < 1e-6);
        assert!((combined_score(0.5, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_graph_support_can_reorder() {
        // Slightly weaker direct match in a dense cluster outranks an isolated one
        let isolated = candidate("isolated", 0.80, 0.0);
        let clustered = candidate("clustered", 0.75, 0.9);
        let ranked = rank(vec![isolated, clustered], 2);
        assert_eq!(ranked[0].chunk.chunk_id, "clustered");
    }

    #[test]
    fn test_rank_truncates_and_orders() {
        let ranked = rank(
            vec![
                candidate("a", 0.3, 0.0),
                candidate("b", 0.9, 0.0),
                candidate("c", 0.6, 0.0),
            ],
            2,
        );
        let ids: Vec<_> = ranked.iter().map(|r| r.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(rank(vec![candidate("a", 0.3, 0.0)], 0).is_empty());
    }

    #[test]
    fn test_ties_break_on_chunk_id() {
        let ranked = rank(vec![candidate("z", 0.5, 0.0), candidate("m", 0.5, 0.0)], 2);
        assert_eq!(ranked[0].chunk.chunk_id, "m");
    }
}
