//! Offline feature-hashing embedder.
//!
//! Produces deterministic dense vectors by hashing terms into fixed-dimension
//! buckets weighted by term frequency. Runs without a network embedding
//! service.

use std::collections::HashMap;

use async_trait::async_trait;
use warren_core::error::ProviderError;
use warren_core::provider::*;
use warren_core::text;

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Hash a term into a bucket index using FNV-1a.
    fn bucket(&self, term: &str) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % self.dimensions as u64) as usize
    }

    /// Embed one text. Empty or stopword-only text yields the zero vector.
    pub fn embed_text(&self, input: &str) -> Vec<f32> {
        let terms = text::terms(input);
        let mut vec = vec![0.0f32; self.dimensions];
        if terms.is_empty() {
            return vec;
        }

        let mut tf: HashMap<&str, f32> = HashMap::new();
        for term in &terms {
            *tf.entry(term.as_str()).or_default() += 1.0;
        }

        let total = terms.len() as f32;
        for (term, count) in tf {
            // Longer terms are rarer; weight them up a little.
            let weight = 1.0 + (term.len() as f32).ln();
            vec[self.bucket(term)] += (count / total) * weight;
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

#[async_trait]
impl Provider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn complete(
        &self,
        _request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        Err(ProviderError::NotConfigured(
            "the hashing embedder cannot generate text".into(),
        ))
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| self.embed_text(t)).collect(),
            model: format!("hashing-{}", self.dimensions),
            usage: None,
        })
    }
}
