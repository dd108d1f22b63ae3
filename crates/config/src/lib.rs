//! Configuration loading, validation, and management for Warren.
//!
//! Loads configuration from `~/.warren/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.warren/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Query embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Hybrid retrieval thresholds and weights
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Context assembly budget
    #[serde(default)]
    pub context: ContextConfig,

    /// Generation timeout and retry policy
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Knowledge corpus location
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("embedding", &self.embedding)
            .field("retrieval", &self.retrieval)
            .field("context", &self.context)
            .field("generation", &self.generation)
            .field("corpus", &self.corpus)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "hashing" (offline) or the name of a configured provider
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector width; must match the corpus
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_provider() -> String {
    "hashing".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_embedding_dimensions() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Cosine similarity a vector hit needs to count
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Saturated BM25 score a lexical hit needs to count
    #[serde(default = "default_min_lexical_score")]
    pub min_lexical_score: f32,

    /// Vector hits needed before lexical results are ignored
    #[serde(default = "default_min_viable_count")]
    pub min_viable_count: usize,

    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,

    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Query embedding attempts before degrading to lexical-only
    #[serde(default = "default_embed_max_attempts")]
    pub embed_max_attempts: u32,

    #[serde(default = "default_embed_backoff_ms")]
    pub embed_backoff_ms: u64,
}

fn default_top_k() -> usize {
    8
}
fn default_min_similarity() -> f32 {
    0.3
}
fn default_min_lexical_score() -> f32 {
    0.2
}
fn default_min_viable_count() -> usize {
    3
}
fn default_vector_weight() -> f32 {
    0.7
}
fn default_keyword_weight() -> f32 {
    0.3
}
fn default_embed_max_attempts() -> u32 {
    2
}
fn default_embed_backoff_ms() -> u64 {
    200
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
            min_lexical_score: default_min_lexical_score(),
            min_viable_count: default_min_viable_count(),
            vector_weight: default_vector_weight(),
            keyword_weight: default_keyword_weight(),
            embed_max_attempts: default_embed_max_attempts(),
            embed_backoff_ms: default_embed_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Total token-equivalent budget for the assembled context
    #[serde(default = "default_budget_tokens")]
    pub budget_tokens: usize,

    /// Tokens reserved for the draft and most recent turns
    #[serde(default = "default_reserved_conversation_tokens")]
    pub reserved_conversation_tokens: usize,

    /// Hard cap on how many prior messages are considered
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
}

fn default_budget_tokens() -> usize {
    3000
}
fn default_reserved_conversation_tokens() -> usize {
    400
}
fn default_max_history_messages() -> usize {
    20
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            budget_tokens: default_budget_tokens(),
            reserved_conversation_tokens: default_reserved_conversation_tokens(),
            max_history_messages: default_max_history_messages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Overall deadline for one generation, retries included
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_max_ms() -> u64 {
    8000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// JSON file or SQLite database holding the indexed chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// "json" or "sqlite"
    #[serde(default = "default_corpus_backend")]
    pub backend: String,
}

fn default_corpus_backend() -> String {
    "json".into()
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: None,
            backend: default_corpus_backend(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.warren/config.toml).
    ///
    /// Environment overrides:
    /// - `WARREN_API_KEY`, then `OPENAI_API_KEY` (only if no key is configured)
    /// - `WARREN_PROVIDER`, `WARREN_MODEL`, `WARREN_CORPUS_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from an explicit path, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("WARREN_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("WARREN_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("WARREN_MODEL") {
            self.default_model = model;
        }

        if let Some(path) = lookup("WARREN_CORPUS_PATH") {
            self.corpus.path = Some(path);
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".warren")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let r = &self.retrieval;
        if r.vector_weight < 0.0 || r.keyword_weight < 0.0 {
            return Err(ConfigError::ValidationError(
                "retrieval weights must not be negative".into(),
            ));
        }
        if r.vector_weight + r.keyword_weight <= 0.0 {
            return Err(ConfigError::ValidationError(
                "vector_weight + keyword_weight must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&r.min_similarity) {
            return Err(ConfigError::ValidationError(
                "retrieval.min_similarity must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..1.0).contains(&r.min_lexical_score) {
            return Err(ConfigError::ValidationError(
                "retrieval.min_lexical_score must be in [0.0, 1.0)".into(),
            ));
        }
        if r.min_viable_count == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.min_viable_count must be at least 1".into(),
            ));
        }
        if r.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".into(),
            ));
        }
        if r.embed_max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.embed_max_attempts must be at least 1".into(),
            ));
        }

        if self.context.budget_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "context.budget_tokens must be > 0".into(),
            ));
        }

        if self.generation.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_attempts must be at least 1".into(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.timeout_secs must be > 0".into(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be > 0".into(),
            ));
        }

        if !matches!(self.corpus.backend.as_str(), "json" | "sqlite") {
            return Err(ConfigError::ValidationError(format!(
                "corpus.backend must be \"json\" or \"sqlite\", got \"{}\"",
                self.corpus.backend
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            generation: GenerationConfig::default(),
            corpus: CorpusConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for warren_core::Error {
    fn from(e: ConfigError) -> Self {
        warren_core::Error::Config {
            message: e.to_string(),
        }
    }
}
