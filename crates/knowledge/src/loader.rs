//! JSON corpus files.
//!
//! Accepts either a bare array of chunk records or `{"chunks": [...]}`.

use std::path::Path;

use serde::Deserialize;
use tracing::info;
use warren_core::error::CorpusError;
use warren_core::knowledge::KnowledgeChunk;

#[derive(Deserialize)]
#[serde(untagged)]
enum CorpusFile {
    Bare(Vec<KnowledgeChunk>),
    Wrapped { chunks: Vec<KnowledgeChunk> },
}

/// Parse chunk records from JSON text.
pub fn parse_json(content: &str) -> Result<Vec<KnowledgeChunk>, CorpusError> {
    let file: CorpusFile =
        serde_json::from_str(content).map_err(|e| CorpusError::ParseError(e.to_string()))?;
    Ok(match file {
        CorpusFile::Bare(chunks) | CorpusFile::Wrapped { chunks } => chunks,
    })
}

/// Read chunk records from a JSON file.
pub async fn load_json(path: &Path) -> Result<Vec<KnowledgeChunk>, CorpusError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CorpusError::ReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    let chunks = parse_json(&content)?;
    info!(path = %path.display(), chunks = chunks.len(), "Loaded corpus file");
    Ok(chunks)
}
