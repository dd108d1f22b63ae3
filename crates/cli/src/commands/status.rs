//! `warren status` — Show the effective configuration.

use std::path::Path;

use warren_config::AppConfig;

pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("Warren Status");
    println!("=============");
    println!("  Config file:  {}", file.display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Temperature:  {}", config.default_temperature);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!(
        "  Embedding:    {} / {} ({} dims)",
        config.embedding.provider, config.embedding.model, config.embedding.dimensions
    );
    println!(
        "  Corpus:       {} ({})",
        config.corpus.path.as_deref().unwrap_or("none"),
        config.corpus.backend
    );
    println!(
        "  Retrieval:    top_k {}, min similarity {}, min viable {}",
        config.retrieval.top_k, config.retrieval.min_similarity, config.retrieval.min_viable_count
    );
    println!(
        "  Context:      {} tokens ({} reserved for conversation)",
        config.context.budget_tokens, config.context.reserved_conversation_tokens
    );
    println!(
        "  Generation:   {}s timeout, {} attempts",
        config.generation.timeout_secs, config.generation.max_attempts
    );
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);

    if file.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, using defaults (run `warren config` for a template)");
    }

    Ok(())
}
