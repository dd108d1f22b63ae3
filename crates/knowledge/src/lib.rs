//! Knowledge corpus storage and search for Warren.
//!
//! Holds indexed compliance chunks behind an atomically swapped snapshot
//! and offers the two independent search paths the Hybrid Retriever
//! combines:
//! - Vector search (cosine similarity over precomputed embeddings)
//! - Lexical search (BM25 over chunk text and tags)

pub mod corpus;
pub mod ingest;
pub mod lexical;
pub mod loader;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod vector;

use std::cmp::Ordering;
use std::sync::Arc;

use warren_core::knowledge::KnowledgeChunk;

pub use corpus::{CorpusSnapshot, CorpusStats, KnowledgeCorpus};
pub use lexical::LexicalIndex;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCorpus;

/// A single-path search hit with that path's raw score.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk: Arc<KnowledgeChunk>,
    pub score: f32,
}

impl Candidate {
    /// Score desc, then newer first, then id asc.
    pub fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.chunk.indexed_at.cmp(&a.chunk.indexed_at))
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    }
}
