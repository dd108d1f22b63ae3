//! Shared test helpers: scripted providers and a tiny keyword corpus.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use warren_core::error::ProviderError;
use warren_core::knowledge::{ChunkCategory, KnowledgeChunk};
use warren_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use warren_knowledge::{CorpusSnapshot, KnowledgeCorpus};

/// A mock provider that returns a sequence of scripted completions.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses
/// provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        requests.push(request);

        let responses = self.responses.lock().unwrap();
        let Some(next) = responses.get(call) else {
            panic!(
                "SequentialMockProvider: no more responses (call #{call}, have {})",
                responses.len()
            );
        };
        next.clone().map(|content| make_text_response(&content, &model))
    }
}

pub fn make_text_response(text: &str, model: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.to_string(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: model.to_string(),
    }
}

/// Words the keyword embedder knows about.
pub const VOCABULARY: &[&str] = &[
    "retirement",
    "linkedin",
    "disclaimer",
    "testimonial",
    "performance",
    "crypto",
    "email",
    "guarantee",
];

/// Embeds text as keyword presence over [`VOCABULARY`], plus a small
/// constant dimension so no vector is zero. Can be told to fail first.
pub struct KeywordEmbedder {
    failures_left: AtomicUsize,
    calls: AtomicUsize,
    /// Extra trailing dimensions, to provoke width mismatches
    pad: usize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::failing(0)
    }

    /// Fail the first `n` calls with a transient network error.
    pub fn failing(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            calls: AtomicUsize::new(0),
            pad: 0,
        }
    }

    pub fn with_padding(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = VOCABULARY
        .iter()
        .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
        .collect();
    v.push(0.1);
    v
}

#[async_trait]
impl Provider for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::NotConfigured("keyword embedder cannot complete".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ProviderError::Network("embedding service unreachable".into()));
        }
        Ok(EmbeddingResponse {
            embeddings: request
                .inputs
                .iter()
                .map(|t| {
                    let mut v = keyword_vector(t);
                    v.extend(std::iter::repeat_n(0.0, self.pad));
                    v
                })
                .collect(),
            model: request.model,
            usage: None,
        })
    }
}

pub fn chunk(id: &str, category: ChunkCategory, text: &str) -> KnowledgeChunk {
    KnowledgeChunk {
        id: id.into(),
        document_id: format!("doc-{id}"),
        category,
        text: text.into(),
        embedding: keyword_vector(text),
        tags: BTreeSet::new(),
        indexed_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    }
}

/// A small compliance corpus with LinkedIn examples and disclaimers.
pub fn sample_chunks() -> Vec<KnowledgeChunk> {
    vec![
        chunk(
            "ex-linkedin-retirement",
            ChunkCategory::Example,
            "LinkedIn example: Planning for retirement starts with clear goals and a diversified approach.",
        ),
        chunk(
            "disc-retirement",
            ChunkCategory::Disclaimer,
            "Disclaimer: retirement planning content is educational. Investing involves risk, including loss of principal.",
        ),
        chunk(
            "guide-linkedin",
            ChunkCategory::PlatformGuide,
            "LinkedIn posts about retirement should stay professional and under 3,000 characters.",
        ),
        chunk(
            "reg-testimonial",
            ChunkCategory::Regulation,
            "The marketing rule restricts testimonial use without clear disclosure of compensation.",
        ),
        chunk(
            "viol-guarantee",
            ChunkCategory::Violation,
            "Violation: promising to guarantee performance or returns is prohibited.",
        ),
    ]
}

pub fn sample_corpus() -> Arc<KnowledgeCorpus> {
    Arc::new(KnowledgeCorpus::new(
        CorpusSnapshot::build(sample_chunks()).unwrap(),
    ))
}
