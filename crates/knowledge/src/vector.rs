//! Vector similarity search over chunk embeddings.

use std::sync::Arc;

use warren_core::error::RetrievalError;
use warren_core::knowledge::KnowledgeChunk;

use crate::Candidate;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank chunks by cosine similarity to a query embedding.
///
/// Only chunks meeting `min_score` are returned, best first. The query
/// must have the corpus dimensionality; an empty corpus accepts any query.
pub fn vector_search(
    chunks: &[Arc<KnowledgeChunk>],
    dimensions: Option<usize>,
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Result<Vec<Candidate>, RetrievalError> {
    let Some(expected) = dimensions else {
        return Ok(Vec::new());
    };
    if query_embedding.len() != expected {
        return Err(RetrievalError::DimensionMismatch {
            expected,
            actual: query_embedding.len(),
        });
    }

    let mut scored: Vec<Candidate> = chunks
        .iter()
        .filter_map(|chunk| {
            let sim = cosine_similarity(&chunk.embedding, query_embedding);
            (sim >= min_score).then(|| Candidate {
                chunk: chunk.clone(),
                score: sim,
            })
        })
        .collect();

    scored.sort_by(Candidate::rank_order);
    scored.truncate(limit);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use warren_core::knowledge::ChunkCategory;

    fn chunk(id: &str, embedding: Vec<f32>) -> Arc<KnowledgeChunk> {
        Arc::new(KnowledgeChunk {
            id: id.into(),
            document_id: "doc".into(),
            category: ChunkCategory::Regulation,
            text: format!("Content for {id}"),
            embedding,
            tags: BTreeSet::new(),
            indexed_at: Utc::now(),
        })
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn search_ranks_and_filters() {
        let chunks = vec![
            chunk("a", vec![0.0, 1.0, 0.0]),
            chunk("b", vec![1.0, 0.0, 0.0]),
            chunk("c", vec![0.5, 0.5, 0.0]),
        ];
        let hits = vector_search(&chunks, Some(3), &[1.0, 0.0, 0.0], 10, 0.5).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn search_respects_limit() {
        let chunks = vec![
            chunk("a", vec![1.0, 0.1]),
            chunk("b", vec![1.0, 0.2]),
            chunk("c", vec![1.0, 0.3]),
        ];
        let hits = vector_search(&chunks, Some(2), &[1.0, 0.0], 2, 0.0).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.id, "a");
    }

    #[test]
    fn dimension_mismatch_is_error() {
        let chunks = vec![chunk("a", vec![1.0, 0.0, 0.0])];
        let err = vector_search(&chunks, Some(3), &[1.0, 0.0], 5, 0.0).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch { expected: 3, actual: 2 }
        ));
    }

    #[test]
    fn empty_corpus_has_no_hits() {
        let hits = vector_search(&[], None, &[1.0], 5, 0.0).unwrap();
        assert!(hits.is_empty());
    }
}
