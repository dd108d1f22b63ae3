//! # Warren Core
//!
//! Domain types, traits, and error definitions for the Warren
//! retrieval-and-generation engine. This crate has **no framework
//! dependencies**; it defines the domain model every other crate
//! implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here (LLM provider, session
//! document manager). Implementations live in their respective crates.
//! This enables:
//! - Swapping implementations via configuration
//! - Testing the pipeline with scripted providers
//! - Clean dependency graph (all crates depend inward on core)

pub mod cancel;
pub mod documents;
pub mod error;
pub mod generation;
pub mod knowledge;
pub mod message;
pub mod provider;
pub mod text;

// Re-export key types at crate root for ergonomics
pub use cancel::CancellationToken;
pub use documents::{NoDocuments, SessionDocumentSource};
pub use error::{Error, Result};
pub use generation::{
    AudienceType, ContentType, ExtractionDiagnostic, GenerationMode, GenerationOutcome,
    SourceAttribution,
};
pub use knowledge::{
    ChunkCategory, FallbackReason, KnowledgeChunk, MatchedBy, RetrievalPath, RetrievalQuery,
    RetrievalResult, ScoredChunk, SearchStrategy,
};
pub use message::{
    ConversationContext, ConversationId, Message, ProcessingStatus, Role, SessionDocumentSummary,
};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
