//! `warren generate` — One advisor request through the full pipeline.

use anyhow::Context;
use tracing::info;

use warren_agent::{ContentPipeline, GenerateRequest, PipelineResponse};
use warren_config::AppConfig;
use warren_core::CancellationToken;
use warren_core::generation::{AudienceType, ContentType, GenerationMode};
use warren_core::message::ConversationContext;

/// Providers that run without an API key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm"];

pub struct GenerateOptions {
    pub message: String,
    pub content_type: ContentType,
    pub audience: AudienceType,
    pub draft: Option<String>,
    pub review: bool,
    pub json: bool,
}

pub async fn run(config: AppConfig, options: GenerateOptions) -> anyhow::Result<()> {
    if !has_credentials(&config) {
        eprintln!();
        eprintln!("  ERROR: No API key configured for '{}'.", config.default_provider);
        eprintln!();
        eprintln!("  Set WARREN_API_KEY or OPENAI_API_KEY, or add it to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let corpus = super::load_corpus(&config).await?;
    let pipeline = ContentPipeline::from_config(&config, corpus)?;

    let conversation = ConversationContext {
        current_draft: options.draft.clone(),
        is_refinement: options.draft.is_some(),
        content_type: options.content_type,
        audience: options.audience,
        ..Default::default()
    };
    let request = GenerateRequest {
        request: options.message,
        content_type: options.content_type,
        audience: options.audience,
        mode: GenerationMode::select(
            conversation.is_refinement,
            conversation.draft(),
            options.review,
        ),
        ..Default::default()
    };

    // Ctrl-C cancels the in-flight provider call instead of killing the process mid-write.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    info!(mode = request.mode.as_str(), "Generating");
    let response = pipeline
        .run(&request, &conversation, &cancel)
        .await
        .context("Generation failed")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render(&response));
    }
    Ok(())
}

fn has_credentials(config: &AppConfig) -> bool {
    config.has_api_key()
        || KEYLESS_PROVIDERS.contains(&config.default_provider.as_str())
        || config
            .providers
            .get(&config.default_provider)
            .is_some_and(|p| p.api_key.is_some())
}

/// Human-readable output: content first, then provenance.
fn render(response: &PipelineResponse) -> String {
    let outcome = &response.outcome;
    let a = &response.attribution;
    let mut out = String::new();

    match &outcome.marketing_content {
        Some(content) => {
            out.push_str("── Marketing content ──\n");
            out.push_str(content);
            out.push_str("\n\n");
        }
        None => out.push_str("(no marketing content yet)\n\n"),
    }
    if !outcome.conversational_text.is_empty() {
        out.push_str("── Assistant ──\n");
        out.push_str(&outcome.conversational_text);
        out.push_str("\n\n");
    }

    out.push_str("── Sources ──\n");
    out.push_str(&format!(
        "  mode {} | strategy {}{} | sources {} | quality {:.2}\n",
        response.mode.as_str(),
        a.strategy.as_str(),
        if a.fallback_used { " (fallback)" } else { "" },
        a.total_sources,
        a.quality_score,
    ));
    out.push_str(&format!(
        "  vector {} | text {} | examples {} | rules {}\n",
        a.vector_results_found,
        a.text_results_found,
        a.marketing_examples_count,
        a.compliance_rules_count,
    ));
    if a.low_grounding {
        out.push_str("  warning: no knowledge sources made it into the prompt\n");
    }
    if !outcome.well_formed && outcome.marketing_content.is_some() {
        out.push_str(&format!("  warning: malformed output {:?}\n", outcome.diagnostics));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_from_provider_table_or_keyless_provider() {
        let mut config = AppConfig::default();
        config.api_key = None;
        config.providers.clear();
        config.default_provider = "openai".into();
        assert!(!has_credentials(&config));

        config.default_provider = "ollama".into();
        assert!(has_credentials(&config));

        config.default_provider = "openai".into();
        config.api_key = Some("sk-test".into());
        assert!(has_credentials(&config));
    }
}
