//! Knowledge corpus and retrieval domain types.
//!
//! A [`KnowledgeChunk`] is created by the ingestion collaborator and is
//! immutable once indexed. The Hybrid Retriever ranks chunks into a
//! [`RetrievalResult`] and reports which [`RetrievalPath`] produced it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::generation::{AudienceType, ContentType};

/// What kind of compliance knowledge a chunk carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkCategory {
    /// SEC / FINRA rule text and interpretations
    Regulation,
    /// Approved disclaimer language
    Disclaimer,
    /// Approved marketing examples
    Example,
    /// Known violations and what made them non-compliant
    Violation,
    /// Platform-specific posting guidance
    #[serde(alias = "platform_guide")]
    PlatformGuide,
}

impl ChunkCategory {
    pub const ALL: [ChunkCategory; 5] = [
        Self::Regulation,
        Self::Disclaimer,
        Self::Example,
        Self::Violation,
        Self::PlatformGuide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regulation => "regulation",
            Self::Disclaimer => "disclaimer",
            Self::Example => "example",
            Self::Violation => "violation",
            Self::PlatformGuide => "platform-guide",
        }
    }
}

impl std::fmt::Display for ChunkCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An indexed fragment of the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document the chunk was cut from
    pub document_id: String,

    pub category: ChunkCategory,

    /// The text body
    pub text: String,

    /// Precomputed embedding, fixed dimensionality across the corpus
    #[serde(default)]
    pub embedding: Vec<f32>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// When the chunk was indexed; newer wins score ties
    #[serde(default = "Utc::now")]
    pub indexed_at: DateTime<Utc>,
}

/// A retrieval request, created per invocation and never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalQuery {
    /// The advisor's free-text request
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<AudienceType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl RetrievalQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// The text sent to both indexes: the request plus hint keywords.
    pub fn search_text(&self) -> String {
        let mut out = self.text.trim().to_string();
        if let Some(ct) = self.content_type.filter(|ct| *ct != ContentType::General) {
            out.push(' ');
            out.push_str(ct.keyword());
        }
        if let Some(aud) = self.audience.filter(|a| *a != AudienceType::General) {
            out.push(' ');
            out.push_str(aud.keyword());
        }
        out
    }
}

/// Which index surfaced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedBy {
    Vector,
    Lexical,
    Both,
}

/// A ranked hit. Scores within one result set share a normalization.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Arc<KnowledgeChunk>,
    pub score: f32,
    pub matched_by: MatchedBy,
}

/// Strategy reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    Vector,
    Hybrid,
    Text,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Hybrid => "hybrid",
            Self::Text => "text",
        }
    }
}

/// Why the retriever fell back to lexical-only ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The embedding service or vector search failed after retries
    VectorUnavailable,
    /// Vector search ran but produced no candidate above threshold
    VectorEmpty,
}

/// The retrieval state machine's terminal state for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum RetrievalPath {
    /// Vector search alone cleared the viability bar
    Vector,
    /// Vector and lexical candidates were fused
    Hybrid,
    /// Lexical-only ranking
    LexicalFallback { reason: FallbackReason },
}

impl RetrievalPath {
    pub fn strategy(&self) -> SearchStrategy {
        match self {
            Self::Vector => SearchStrategy::Vector,
            Self::Hybrid => SearchStrategy::Hybrid,
            Self::LexicalFallback { .. } => SearchStrategy::Text,
        }
    }

    pub fn fallback_used(&self) -> bool {
        matches!(self, Self::LexicalFallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            Self::LexicalFallback { reason } => Some(*reason),
            _ => None,
        }
    }
}

/// Ranked retrieval output plus the provenance of how it was produced.
///
/// Invariant: `hits` is ordered by descending score, ties broken by
/// newer `indexed_at` first and then ascending chunk id.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    hits: Vec<ScoredChunk>,
    pub path: RetrievalPath,
    /// Vector candidates above the similarity threshold
    pub vector_found: usize,
    /// Lexical candidates above the lexical threshold
    pub lexical_found: usize,
}

impl RetrievalResult {
    /// Build a result, enforcing the ordering invariant and the `top_k` cap.
    pub fn ranked(
        mut hits: Vec<ScoredChunk>,
        path: RetrievalPath,
        vector_found: usize,
        lexical_found: usize,
        top_k: usize,
    ) -> Self {
        hits.sort_by(compare_hits);
        hits.truncate(top_k);
        Self {
            hits,
            path,
            vector_found,
            lexical_found,
        }
    }

    /// An empty result; always a lexical fallback.
    pub fn empty(reason: FallbackReason) -> Self {
        Self {
            hits: Vec::new(),
            path: RetrievalPath::LexicalFallback { reason },
            vector_found: 0,
            lexical_found: 0,
        }
    }

    pub fn hits(&self) -> &[ScoredChunk] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.path.strategy()
    }

    pub fn fallback_used(&self) -> bool {
        self.path.fallback_used()
    }
}

/// Total order over hits: score desc, then recency desc, then id asc.
pub fn compare_hits(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.chunk.indexed_at.cmp(&a.chunk.indexed_at))
        .then_with(|| a.chunk.id.cmp(&b.chunk.id))
}

/// Count chunks per category.
pub fn count_by_category<'a>(
    chunks: impl IntoIterator<Item = &'a KnowledgeChunk>,
) -> BTreeMap<ChunkCategory, usize> {
    let mut counts = BTreeMap::new();
    for chunk in chunks {
        *counts.entry(chunk.category).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn chunk(id: &str, day: u32) -> Arc<KnowledgeChunk> {
        Arc::new(KnowledgeChunk {
            id: id.into(),
            document_id: "doc".into(),
            category: ChunkCategory::Regulation,
            text: "Rule 2210".into(),
            embedding: vec![1.0],
            tags: BTreeSet::new(),
            indexed_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        })
    }

    fn hit(id: &str, day: u32, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: chunk(id, day),
            score,
            matched_by: MatchedBy::Vector,
        }
    }

    #[test]
    fn ranked_orders_by_score_then_recency_then_id() {
        let result = RetrievalResult::ranked(
            vec![
                hit("b", 1, 0.5),
                hit("a", 1, 0.5),
                hit("c", 3, 0.5),
                hit("d", 1, 0.9),
            ],
            RetrievalPath::Vector,
            4,
            0,
            10,
        );
        let ids: Vec<_> = result.hits().iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "a", "b"]);
    }

    #[test]
    fn ranked_truncates_to_top_k() {
        let result = RetrievalResult::ranked(
            vec![hit("a", 1, 0.9), hit("b", 1, 0.8), hit("c", 1, 0.7)],
            RetrievalPath::Hybrid,
            3,
            3,
            2,
        );
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn fallback_path_reports_text_strategy() {
        let result = RetrievalResult::empty(FallbackReason::VectorUnavailable);
        assert_eq!(result.strategy(), SearchStrategy::Text);
        assert!(result.fallback_used());
        assert!(result.is_empty());
    }

    #[test]
    fn category_parses_kebab_and_snake() {
        let a: ChunkCategory = serde_json::from_str("\"platform-guide\"").unwrap();
        let b: ChunkCategory = serde_json::from_str("\"platform_guide\"").unwrap();
        assert_eq!(a, ChunkCategory::PlatformGuide);
        assert_eq!(a, b);
    }

    #[test]
    fn search_text_appends_hints() {
        let q = RetrievalQuery {
            text: "Post about retirement".into(),
            content_type: Some(ContentType::Linkedin),
            audience: Some(AudienceType::Retirees),
            session_id: None,
        };
        let text = q.search_text();
        assert!(text.starts_with("Post about retirement"));
        assert!(text.contains("linkedin"));
        assert!(text.contains("retirees"));
    }
}
