pub mod config_cmd;
pub mod corpus;
pub mod generate;
pub mod serve;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use warren_config::AppConfig;
use warren_core::provider::Provider;
use warren_knowledge::{CorpusSnapshot, KnowledgeCorpus, SqliteCorpus, ingest, loader};
use warren_providers::{build_from_config, embedding_provider};

/// Chunks embedded per provider call when a corpus arrives without vectors.
const EMBED_BATCH: usize = 32;

/// Logs go to stderr so `--json` output on stdout stays parseable.
pub fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => AppConfig::load().context("Failed to load config"),
    }
}

/// Load the configured corpus and publish it as the first snapshot.
///
/// Chunks without a precomputed embedding are embedded with the configured
/// embedding provider first. No configured path yields an empty corpus.
pub async fn load_corpus(config: &AppConfig) -> anyhow::Result<Arc<KnowledgeCorpus>> {
    let Some(path) = config.corpus.path.as_deref() else {
        warn!("No corpus path configured; every request will use the no-sources fallback");
        return Ok(Arc::new(KnowledgeCorpus::empty()));
    };

    let mut chunks = match config.corpus.backend.as_str() {
        "json" => loader::load_json(Path::new(path)).await?,
        "sqlite" => SqliteCorpus::open(path).await?.load_all().await?,
        other => anyhow::bail!("Unknown corpus backend '{other}' (expected json or sqlite)"),
    };

    if chunks.iter().any(|c| c.embedding.is_empty()) {
        let router = build_from_config(config);
        let embedder = embedding_provider(&router, config)?;
        let embedded = ingest::embed_missing(
            &mut chunks,
            embedder.as_ref(),
            &config.embedding.model,
            EMBED_BATCH,
        )
        .await?;
        info!(embedded, provider = embedder.name(), "Embedded chunks without vectors");
    }

    let snapshot = CorpusSnapshot::build(chunks).context("Corpus failed validation")?;
    info!(chunks = snapshot.len(), backend = %config.corpus.backend, "Corpus ready");
    Ok(Arc::new(KnowledgeCorpus::new(snapshot)))
}

/// Parse a snake_case enum value the same way the HTTP API does.
pub fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unknown value '{value}'"))
}
