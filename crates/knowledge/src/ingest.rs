//! Ingestion helpers on the writer path.

use tracing::debug;
use warren_core::error::CorpusError;
use warren_core::knowledge::KnowledgeChunk;
use warren_core::provider::{EmbeddingRequest, Provider};

/// Fill in embeddings for chunks that arrived without one.
///
/// Returns how many chunks were embedded. Chunks that already carry an
/// embedding are left untouched.
pub async fn embed_missing(
    chunks: &mut [KnowledgeChunk],
    provider: &dyn Provider,
    model: &str,
    batch_size: usize,
) -> Result<usize, CorpusError> {
    let pending: Vec<usize> = chunks
        .iter()
        .enumerate()
        .filter(|(_, c)| c.embedding.is_empty())
        .map(|(i, _)| i)
        .collect();

    for batch in pending.chunks(batch_size.max(1)) {
        let inputs = batch.iter().map(|&i| chunks[i].text.clone()).collect();
        let response = provider
            .embed(EmbeddingRequest {
                model: model.to_string(),
                inputs,
            })
            .await
            .map_err(|e| CorpusError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != batch.len() {
            return Err(CorpusError::EmbeddingFailed(format!(
                "provider returned {} embeddings for {} inputs",
                response.embeddings.len(),
                batch.len()
            )));
        }

        for (&i, embedding) in batch.iter().zip(response.embeddings) {
            chunks[i].embedding = embedding;
        }
        debug!(count = batch.len(), "Embedded chunk batch");
    }

    Ok(pending.len())
}
