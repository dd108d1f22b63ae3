//! `warren corpus` — Inspect the knowledge corpus.

use warren_agent::HybridRetriever;
use warren_config::AppConfig;
use warren_core::generation::ContentType;
use warren_core::knowledge::RetrievalQuery;
use warren_providers::{build_from_config, embedding_provider};

pub async fn stats(config: &AppConfig) -> anyhow::Result<()> {
    let corpus = super::load_corpus(config).await?;
    let stats = corpus.stats().await;

    println!("Knowledge corpus");
    println!("  Chunks:     {}", stats.total_chunks);
    println!("  Documents:  {}", stats.documents);
    match stats.dimensions {
        Some(d) => println!("  Dimensions: {d}"),
        None => println!("  Dimensions: -"),
    }
    for (category, count) in &stats.by_category {
        println!("  {:<16} {count}", category.as_str());
    }
    Ok(())
}

pub async fn search(
    config: &AppConfig,
    query: &str,
    top_k: Option<usize>,
    content_type: Option<ContentType>,
) -> anyhow::Result<()> {
    let corpus = super::load_corpus(config).await?;
    let router = build_from_config(config);
    let embedder = embedding_provider(&router, config)?;
    let retriever = HybridRetriever::from_config(corpus, embedder, config);

    let query = RetrievalQuery {
        content_type,
        ..RetrievalQuery::new(query)
    };
    let result = retriever
        .retrieve(&query, top_k.unwrap_or(retriever.default_top_k()))
        .await;

    println!(
        "Strategy: {}{}  (vector {}, text {})",
        result.strategy().as_str(),
        match result.path.fallback_reason() {
            Some(reason) => format!(" [fallback: {reason:?}]"),
            None => String::new(),
        },
        result.vector_found,
        result.lexical_found
    );
    if result.is_empty() {
        println!("No matching chunks.");
    }
    for (rank, hit) in result.hits().iter().enumerate() {
        println!(
            "{:>2}. {:.3} {:?} [{} | {}] {}",
            rank + 1,
            hit.score,
            hit.matched_by,
            hit.chunk.category,
            hit.chunk.id,
            preview(&hit.chunk.text, 100)
        );
    }
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{cut}…")
}
