//! `warren serve` — Start the HTTP API server.

use warren_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let corpus = super::load_corpus(&config).await?;

    println!("Warren Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.default_model);

    warren_gateway::start(config, corpus)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))?;

    Ok(())
}
