//! Hybrid Retriever.
//!
//! Runs vector and lexical search over one corpus snapshot concurrently,
//! then resolves the outcome into an explicit [`RetrievalPath`]:
//!
//! | Vector path | Result |
//! |-------------|--------|
//! | ≥ `min_viable_count` hits | `Vector` |
//! | 1 .. `min_viable_count` hits | `Hybrid` (normalized, weighted fusion) |
//! | no hits | `LexicalFallback { VectorEmpty }` |
//! | embedding or search error | `LexicalFallback { VectorUnavailable }` |
//!
//! Retrieval never fails the request: every error degrades to a
//! lexical-only or empty result.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use warren_config::{AppConfig, RetrievalConfig};
use warren_core::error::RetrievalError;
use warren_core::knowledge::{
    FallbackReason, MatchedBy, RetrievalPath, RetrievalQuery, RetrievalResult, ScoredChunk,
};
use warren_core::provider::{EmbeddingRequest, Provider};
use warren_knowledge::{Candidate, CorpusSnapshot, KnowledgeCorpus};
use warren_providers::RetryPolicy;

pub struct HybridRetriever {
    corpus: Arc<KnowledgeCorpus>,
    embedder: Arc<dyn Provider>,
    embedding_model: String,
    settings: RetrievalConfig,
    embed_retry: RetryPolicy,
}

impl HybridRetriever {
    pub fn new(
        corpus: Arc<KnowledgeCorpus>,
        embedder: Arc<dyn Provider>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self::with_settings(corpus, embedder, embedding_model, RetrievalConfig::default())
    }

    pub fn with_settings(
        corpus: Arc<KnowledgeCorpus>,
        embedder: Arc<dyn Provider>,
        embedding_model: impl Into<String>,
        settings: RetrievalConfig,
    ) -> Self {
        let backoff = Duration::from_millis(settings.embed_backoff_ms);
        let embed_retry = RetryPolicy::new(settings.embed_max_attempts, backoff, backoff * 4);
        Self {
            corpus,
            embedder,
            embedding_model: embedding_model.into(),
            settings,
            embed_retry,
        }
    }

    pub fn from_config(
        corpus: Arc<KnowledgeCorpus>,
        embedder: Arc<dyn Provider>,
        config: &AppConfig,
    ) -> Self {
        Self::with_settings(
            corpus,
            embedder,
            config.embedding.model.clone(),
            config.retrieval.clone(),
        )
    }

    pub fn corpus(&self) -> &Arc<KnowledgeCorpus> {
        &self.corpus
    }

    pub fn default_top_k(&self) -> usize {
        self.settings.top_k
    }

    /// Retrieve at most `top_k` ranked chunks for `query`.
    /// A `top_k` of zero is treated as one.
    pub async fn retrieve(&self, query: &RetrievalQuery, top_k: usize) -> RetrievalResult {
        let top_k = top_k.max(1);
        let snapshot = self.corpus.snapshot().await;
        let search_text = query.search_text();

        if snapshot.is_empty() || search_text.is_empty() {
            info!(
                strategy = "text",
                generation = snapshot.generation(),
                "Retrieval skipped: empty corpus or query"
            );
            return RetrievalResult::empty(FallbackReason::VectorEmpty);
        }

        let (vector, lexical) = tokio::join!(self.vector_candidates(&snapshot, &search_text), async {
            snapshot.lexical_search(&search_text, snapshot.len(), self.settings.min_lexical_score)
        });

        let result = self.resolve(vector, lexical, top_k);
        info!(
            strategy = result.strategy().as_str(),
            fallback_reason = ?result.path.fallback_reason(),
            vector_found = result.vector_found,
            text_found = result.lexical_found,
            hits = result.len(),
            generation = snapshot.generation(),
            "Retrieval strategy decided"
        );
        result
    }

    /// Embed the query (with retries) and run vector search.
    async fn vector_candidates(
        &self,
        snapshot: &CorpusSnapshot,
        search_text: &str,
    ) -> Result<Vec<Candidate>, RetrievalError> {
        let embedding = self.embed_query(search_text).await?;
        snapshot.vector_search(&embedding, snapshot.len(), self.settings.min_similarity)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let request = EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![text.to_string()],
            };
            match self.embedder.embed(request).await {
                Ok(mut response) => {
                    return response
                        .embeddings
                        .pop()
                        .filter(|e| !e.is_empty())
                        .ok_or_else(|| {
                            RetrievalError::EmbeddingFailed("provider returned no embedding".into())
                        });
                }
                Err(e) if e.is_transient() && attempt < self.embed_retry.max_attempts => {
                    let delay = self.embed_retry.delay_for(attempt, &e);
                    warn!(
                        provider = %self.embedder.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Query embedding failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(provider = %self.embedder.name(), attempt, error = %e, "Query embedding failed");
                    return Err(RetrievalError::EmbeddingFailed(e.to_string()));
                }
            }
        }
    }

    /// The strategy state machine. Pure given its inputs.
    fn resolve(
        &self,
        vector: Result<Vec<Candidate>, RetrievalError>,
        lexical: Vec<Candidate>,
        top_k: usize,
    ) -> RetrievalResult {
        let lexical_found = lexical.len();

        let vector = match vector {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Vector path unavailable, using lexical ranking");
                return Self::lexical_only(lexical, FallbackReason::VectorUnavailable, 0, top_k);
            }
        };
        let vector_found = vector.len();

        if vector_found == 0 {
            return Self::lexical_only(lexical, FallbackReason::VectorEmpty, 0, top_k);
        }

        if vector_found >= self.settings.min_viable_count {
            let lexical_ids: HashSet<&str> = lexical.iter().map(|c| c.chunk.id.as_str()).collect();
            let hits = vector
                .iter()
                .map(|c| ScoredChunk {
                    chunk: c.chunk.clone(),
                    score: c.score,
                    matched_by: if lexical_ids.contains(c.chunk.id.as_str()) {
                        MatchedBy::Both
                    } else {
                        MatchedBy::Vector
                    },
                })
                .collect();
            return RetrievalResult::ranked(
                hits,
                RetrievalPath::Vector,
                vector_found,
                lexical_found,
                top_k,
            );
        }

        debug!(vector_found, lexical_found, "Vector below viable count, fusing with lexical");
        let hits = fuse(
            &vector,
            &lexical,
            self.settings.vector_weight,
            self.settings.keyword_weight,
        );
        RetrievalResult::ranked(hits, RetrievalPath::Hybrid, vector_found, lexical_found, top_k)
    }

    fn lexical_only(
        lexical: Vec<Candidate>,
        reason: FallbackReason,
        vector_found: usize,
        top_k: usize,
    ) -> RetrievalResult {
        if lexical.is_empty() {
            return RetrievalResult::empty(reason);
        }
        let lexical_found = lexical.len();
        let hits = lexical
            .into_iter()
            .map(|c| ScoredChunk {
                chunk: c.chunk,
                score: c.score,
                matched_by: MatchedBy::Lexical,
            })
            .collect();
        RetrievalResult::ranked(
            hits,
            RetrievalPath::LexicalFallback { reason },
            vector_found,
            lexical_found,
            top_k,
        )
    }
}

/// Weighted fusion of two candidate lists.
///
/// Each list is scaled into [0, 1] by its own best score, weights are
/// normalized to sum to one, and a chunk found by both paths gets both
/// contributions.
fn fuse(
    vector: &[Candidate],
    lexical: &[Candidate],
    vector_weight: f32,
    keyword_weight: f32,
) -> Vec<ScoredChunk> {
    let total = vector_weight + keyword_weight;
    let (vw, kw) = if total > 0.0 {
        (vector_weight / total, keyword_weight / total)
    } else {
        (0.5, 0.5)
    };

    let mut merged: HashMap<&str, ScoredChunk> = HashMap::new();
    for (list, weight, kind) in [(vector, vw, MatchedBy::Vector), (lexical, kw, MatchedBy::Lexical)] {
        let max = list.iter().map(|c| c.score).fold(0.0f32, f32::max);
        for c in list {
            let normalized = if max > 0.0 { (c.score / max).clamp(0.0, 1.0) } else { 0.0 };
            let contribution = weight * normalized;
            merged
                .entry(c.chunk.id.as_str())
                .and_modify(|hit| {
                    hit.score = (hit.score + contribution).min(1.0);
                    hit.matched_by = MatchedBy::Both;
                })
                .or_insert_with(|| ScoredChunk {
                    chunk: c.chunk.clone(),
                    score: contribution,
                    matched_by: kind,
                });
        }
    }
    merged.into_values().collect()
}
