//! Provider implementations for Warren.
//!
//! All providers implement the `warren_core::Provider` trait.
//! The router selects the correct provider based on configuration, and
//! the Generation Client wraps one with timeout, retry, and cancellation.

pub mod generation;
pub mod hashing;
pub mod openai_compat;
pub mod retry;
pub mod router;

pub use generation::GenerationClient;
pub use hashing::HashingEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryPolicy;
pub use router::{ProviderRouter, build_from_config, embedding_provider};
