//! Error types for the Warren domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Conditions the engine recovers from locally (a degraded or empty
//! retrieval, malformed model output) are not errors. They travel as
//! tagged values on the results instead, see
//! [`crate::knowledge::RetrievalPath`] and
//! [`crate::generation::ExtractionDiagnostic`].

use thiserror::Error;

/// The top-level error type for all Warren operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Corpus errors ---
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport-level failures reported by an LLM or embedding provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate limits, network faults, and 5xx responses are transient.
    /// Authentication, missing models, and 4xx responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::ModelNotFound(_) | Self::NotConfigured(_) => {
                false
            }
        }
    }
}

/// Typed failure of the Generation Client. Never surfaced as content.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Generation rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Generation provider error: {0}")]
    Provider(ProviderError),

    #[error("Generation cancelled by caller")]
    Cancelled,
}

/// Failures on a single retrieval path. The retriever degrades instead
/// of propagating these, so callers only see them in logs.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Embedding dimension mismatch: corpus uses {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Corpus ingestion and loading failures.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to read corpus at {path}: {reason}")]
    ReadError { path: String, reason: String },

    #[error("Failed to parse corpus: {0}")]
    ParseError(String),

    #[error("Invalid chunk '{chunk_id}': {reason}")]
    InvalidChunk { chunk_id: String, reason: String },

    #[error("Duplicate chunk id: {0}")]
    DuplicateChunk(String),

    #[error("Embedding chunks failed: {0}")]
    EmbeddingFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
