//! Token-budgeted context assembly.
//!
//! | Priority | Layer | Trim strategy |
//! |----------|-------|---------------|
//! | 1 | Draft + newest turns | Draft truncated, turns within the reservation |
//! | 2 | Knowledge chunks | Chunks that don't fit are skipped, rank order kept |
//! | 3 | Session documents | Later documents dropped |
//! | 4 | Older turns | Oldest dropped (sliding window) |

pub mod assembler;
pub mod token;

pub use assembler::{AssembledContext, AssemblyMetadata, ContextAssembler, DropInfo, LayerStats};
