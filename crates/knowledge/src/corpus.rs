//! Knowledge Corpus Store.
//!
//! Readers take an `Arc` to an immutable [`CorpusSnapshot`] and keep using
//! it for the whole request. The writer builds a complete new snapshot
//! off to the side and swaps it in, so a reader sees either the old or
//! the new index, never a partially rebuilt one.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use warren_core::error::{CorpusError, RetrievalError};
use warren_core::knowledge::{ChunkCategory, KnowledgeChunk, count_by_category};

use crate::Candidate;
use crate::lexical::LexicalIndex;
use crate::vector;

/// An immutable, fully indexed view of the corpus.
#[derive(Debug)]
pub struct CorpusSnapshot {
    chunks: Vec<Arc<KnowledgeChunk>>,
    lexical: LexicalIndex,
    dimensions: Option<usize>,
    generation: u64,
    built_at: DateTime<Utc>,
}

impl CorpusSnapshot {
    /// Validate chunks and build both indexes.
    ///
    /// Every chunk needs a non-empty id unique in the corpus, non-blank
    /// text, and an embedding of the same non-zero width as the others.
    pub fn build(chunks: Vec<KnowledgeChunk>) -> Result<Self, CorpusError> {
        let mut seen = HashSet::new();
        let mut dimensions = None;

        for chunk in &chunks {
            if chunk.id.trim().is_empty() {
                return Err(CorpusError::InvalidChunk {
                    chunk_id: chunk.id.clone(),
                    reason: "empty id".into(),
                });
            }
            if !seen.insert(chunk.id.as_str()) {
                return Err(CorpusError::DuplicateChunk(chunk.id.clone()));
            }
            if chunk.text.trim().is_empty() {
                return Err(CorpusError::InvalidChunk {
                    chunk_id: chunk.id.clone(),
                    reason: "empty text".into(),
                });
            }
            if chunk.embedding.is_empty() {
                return Err(CorpusError::InvalidChunk {
                    chunk_id: chunk.id.clone(),
                    reason: "missing embedding".into(),
                });
            }
            match dimensions {
                None => dimensions = Some(chunk.embedding.len()),
                Some(d) if d != chunk.embedding.len() => {
                    return Err(CorpusError::InvalidChunk {
                        chunk_id: chunk.id.clone(),
                        reason: format!(
                            "embedding has {} dimensions, corpus uses {d}",
                            chunk.embedding.len()
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        let chunks: Vec<Arc<KnowledgeChunk>> = chunks.into_iter().map(Arc::new).collect();
        let lexical = LexicalIndex::build(&chunks);

        Ok(Self {
            chunks,
            lexical,
            dimensions,
            generation: 0,
            built_at: Utc::now(),
        })
    }

    pub fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            lexical: LexicalIndex::default(),
            dimensions: None,
            generation: 0,
            built_at: Utc::now(),
        }
    }

    pub fn chunks(&self) -> &[Arc<KnowledgeChunk>] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding width, or `None` for an empty corpus.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: &str) -> Option<&Arc<KnowledgeChunk>> {
        self.chunks.iter().find(|c| c.id == id)
    }

    pub fn vector_search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<Candidate>, RetrievalError> {
        vector::vector_search(
            &self.chunks,
            self.dimensions,
            query_embedding,
            limit,
            min_score,
        )
    }

    pub fn lexical_search(&self, query: &str, limit: usize, min_score: f32) -> Vec<Candidate> {
        self.lexical.search(&self.chunks, query, limit, min_score)
    }

    pub fn stats(&self) -> CorpusStats {
        let documents: HashSet<&str> = self.chunks.iter().map(|c| c.document_id.as_str()).collect();
        CorpusStats {
            total_chunks: self.chunks.len(),
            documents: documents.len(),
            by_category: count_by_category(self.chunks.iter().map(|c| c.as_ref())),
            dimensions: self.dimensions,
            generation: self.generation,
            built_at: self.built_at,
        }
    }
}

/// Corpus counts for status endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStats {
    pub total_chunks: usize,
    pub documents: usize,
    pub by_category: BTreeMap<ChunkCategory, usize>,
    pub dimensions: Option<usize>,
    pub generation: u64,
    pub built_at: DateTime<Utc>,
}

/// Shared handle to the current snapshot.
pub struct KnowledgeCorpus {
    current: RwLock<Arc<CorpusSnapshot>>,
}

impl KnowledgeCorpus {
    pub fn new(snapshot: CorpusSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn empty() -> Self {
        Self::new(CorpusSnapshot::empty())
    }

    /// The snapshot to use for one request.
    pub async fn snapshot(&self) -> Arc<CorpusSnapshot> {
        self.current.read().await.clone()
    }

    /// Atomically publish a new snapshot; returns its generation.
    ///
    /// Callers serialize writes. In-flight readers keep their old snapshot.
    pub async fn replace(&self, mut snapshot: CorpusSnapshot) -> u64 {
        let mut current = self.current.write().await;
        snapshot.generation = current.generation + 1;
        let generation = snapshot.generation;
        info!(
            generation,
            chunks = snapshot.len(),
            "Publishing new corpus snapshot"
        );
        *current = Arc::new(snapshot);
        generation
    }

    pub async fn stats(&self) -> CorpusStats {
        self.snapshot().await.stats()
    }
}

impl Default for KnowledgeCorpus {
    fn default() -> Self {
        Self::empty()
    }
}
