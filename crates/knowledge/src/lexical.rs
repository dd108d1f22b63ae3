//! In-memory BM25 keyword index.
//!
//! Built once per corpus snapshot and never mutated afterwards. Raw BM25
//! scores are unbounded, so they are saturated with `s / (s + 1)` into
//! [0, 1) to keep thresholds absolute across corpora.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use warren_core::knowledge::KnowledgeChunk;
use warren_core::text;

use crate::Candidate;

const K1: f32 = 1.2;
const B: f32 = 0.75;

#[derive(Debug, Default)]
pub struct LexicalIndex {
    /// Per-chunk term frequencies, parallel to the snapshot's chunk list
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<u32>,
    /// Number of chunks containing each term
    doc_freq: HashMap<String, u32>,
    avg_doc_len: f32,
}

impl LexicalIndex {
    /// Index chunk text plus tags.
    pub fn build(chunks: &[Arc<KnowledgeChunk>]) -> Self {
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lens = Vec::with_capacity(chunks.len());
        let mut doc_freq: HashMap<String, u32> = HashMap::new();

        for chunk in chunks {
            let mut terms = text::terms(&chunk.text);
            for tag in &chunk.tags {
                terms.extend(text::terms(tag));
            }

            let mut tf: HashMap<String, u32> = HashMap::new();
            for term in &terms {
                *tf.entry(term.clone()).or_default() += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }

            doc_lens.push(terms.len() as u32);
            term_freqs.push(tf);
        }

        let total: u64 = doc_lens.iter().map(|&l| l as u64).sum();
        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            total as f32 / doc_lens.len() as f32
        };

        Self {
            term_freqs,
            doc_lens,
            doc_freq,
            avg_doc_len,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.len() as f32;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Raw BM25 score of one indexed chunk against deduplicated query terms.
    fn bm25(&self, doc: usize, query_terms: &[String]) -> f32 {
        let tf_map = &self.term_freqs[doc];
        let dl = self.doc_lens[doc] as f32;
        let norm = if self.avg_doc_len > 0.0 {
            dl / self.avg_doc_len
        } else {
            1.0
        };

        query_terms
            .iter()
            .filter_map(|term| {
                let tf = *tf_map.get(term)? as f32;
                let idf = self.idf(term);
                Some(idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * norm)))
            })
            .sum()
    }

    /// Rank `chunks` (the list this index was built from) against `query`.
    pub fn search(
        &self,
        chunks: &[Arc<KnowledgeChunk>],
        query: &str,
        limit: usize,
        min_score: f32,
    ) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let query_terms: Vec<String> = text::terms(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        if query_terms.is_empty() || self.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<Candidate> = (0..self.len().min(chunks.len()))
            .filter_map(|doc| {
                let raw = self.bm25(doc, &query_terms);
                if raw <= 0.0 {
                    return None;
                }
                let score = raw / (raw + 1.0);
                (score >= min_score).then(|| Candidate {
                    chunk: chunks[doc].clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(Candidate::rank_order);
        hits.truncate(limit);
        hits
    }
}
