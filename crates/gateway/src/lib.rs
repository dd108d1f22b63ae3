//! HTTP API gateway for Warren.
//!
//! Exposes the health check and the v1 API: content generation,
//! conversation history, session documents, and retrieval debugging.
//!
//! Built on Axum.

pub mod api_v1;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use warren_config::{AppConfig, GatewayConfig};
use warren_knowledge::KnowledgeCorpus;

pub use api_v1::{ApiV1State, SharedApiState};

/// Build the full router: `/health` plus the v1 API under `/v1`.
///
/// Layers applied:
/// - Request body size limit (`gateway.max_body_bytes`)
/// - CORS limited to the gateway's own localhost origin
/// - HTTP trace logging
pub fn build_router(state: SharedApiState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(config.port))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(port: u16) -> CorsLayer {
    let origin = HeaderValue::from_str(&format!("http://localhost:{port}"))
        .map(AllowOrigin::exact)
        .unwrap_or_else(|_| AllowOrigin::list(Vec::<HeaderValue>::new()));
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Start the gateway HTTP server and serve until Ctrl-C.
pub async fn start(
    config: AppConfig,
    corpus: Arc<KnowledgeCorpus>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(ApiV1State::from_config(&config, corpus)?);
    let stats = state.corpus.stats().await;
    let app = build_router(state, &config.gateway);

    info!(
        addr = %addr,
        provider = %config.default_provider,
        model = %config.default_model,
        corpus_chunks = stats.total_chunks,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
