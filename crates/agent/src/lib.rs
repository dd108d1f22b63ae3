//! The Warren retrieval-and-generation core.
//!
//! One advisor request flows through:
//!
//! 1. **Retrieve** ranked compliance knowledge ([`HybridRetriever`])
//! 2. **Assemble** draft, conversation, knowledge, and documents under a
//!    token budget ([`ContextAssembler`])
//! 3. **Compose** the mode-specific prompt ([`PromptComposer`])
//! 4. **Generate** via the Generation Client (timeout, retries, cancellation)
//! 5. **Extract** marketing content from conversational text ([`extractor`])
//! 6. **Attribute** sources and grounding quality ([`attribution`])
//!
//! [`ContentPipeline`] runs the whole sequence.

pub mod attribution;
pub mod context;
pub mod extractor;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{AssembledContext, AssemblyMetadata, ContextAssembler, DropInfo, LayerStats};
pub use pipeline::{ContentPipeline, GenerateRequest, PipelineResponse};
pub use prompt::{ComposeRequest, Prompt, PromptComposer};
pub use retriever::HybridRetriever;
