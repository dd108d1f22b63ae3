//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/generate`                 — One advisor request through the pipeline
//! - `GET  /v1/conversations/{id}`       — Stored conversation history
//! - `PUT  /v1/sessions/{id}/documents`  — Replace a session's document summaries
//! - `GET  /v1/sessions/{id}/documents`  — List a session's document summaries
//! - `GET  /v1/knowledge/stats`          — Corpus counts by category
//! - `POST /v1/retrieval/debug`          — Run retrieval only and show the ranking

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use warren_agent::{AssemblyMetadata, ContentPipeline, GenerateRequest};
use warren_config::AppConfig;
use warren_core::error::{Error, GenerationError, ProviderError};
use warren_core::generation::{
    AudienceType, ContentType, ExtractionDiagnostic, GenerationMode,
};
use warren_core::knowledge::{
    ChunkCategory, FallbackReason, MatchedBy, RetrievalQuery, SearchStrategy,
};
use warren_core::message::{ConversationContext, Message, SessionDocumentSummary};
use warren_core::{CancellationToken, ConversationId};
use warren_knowledge::{CorpusStats, KnowledgeCorpus};

use crate::store::{ConversationStore, MAX_SESSION_DOCUMENTS, SessionDocumentStore, StoredConversation};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub pipeline: ContentPipeline,
    pub corpus: Arc<KnowledgeCorpus>,
    pub conversations: ConversationStore,
    pub documents: Arc<SessionDocumentStore>,
}

pub type SharedApiState = Arc<ApiV1State>;

impl ApiV1State {
    /// Route the pipeline's session-document lookups to this gateway's store.
    pub fn new(pipeline: ContentPipeline) -> Self {
        let corpus = pipeline.retriever().corpus().clone();
        let documents = Arc::new(SessionDocumentStore::new());
        Self {
            pipeline: pipeline.with_documents(documents.clone()),
            corpus,
            conversations: ConversationStore::default(),
            documents,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        corpus: Arc<KnowledgeCorpus>,
    ) -> Result<Self, ProviderError> {
        Ok(Self::new(ContentPipeline::from_config(config, corpus)?))
    }
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/generate", post(generate_handler))
        .route("/conversations/{id}", get(get_conversation_handler))
        .route(
            "/sessions/{id}/documents",
            get(list_documents_handler).put(put_documents_handler),
        )
        .route("/knowledge/stats", get(knowledge_stats_handler))
        .route("/retrieval/debug", post(retrieval_debug_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    #[serde(alias = "message")]
    pub request: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default, alias = "audience")]
    pub audience_type: AudienceType,
    /// Existing conversation ID (omit to start a new one)
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub previous_context: Option<PreviousContext>,
    #[serde(default)]
    pub current_content: Option<String>,
    #[serde(default)]
    pub is_refinement: bool,
    #[serde(default)]
    pub review_requested: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Caller-held history. When present it replaces the stored history.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousContext {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub documents: Vec<SessionDocumentSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub status: &'static str,
    pub conversation_id: String,
    pub mode: GenerationMode,
    /// Raw model output, markers included
    pub content: String,
    pub marketing_content: Option<String>,
    pub conversational_text: String,
    pub well_formed: bool,
    pub diagnostics: Vec<ExtractionDiagnostic>,
    pub search_strategy: SearchStrategy,
    pub vector_results_found: usize,
    pub text_results_found: usize,
    pub total_knowledge_sources: usize,
    pub fallback_used: bool,
    pub context_quality_score: f64,
    pub marketing_examples_count: usize,
    pub compliance_rules_count: usize,
    pub low_grounding: bool,
    pub sources_by_category: BTreeMap<ChunkCategory, usize>,
    pub context: AssemblyMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>, conversation_id: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            status: "error",
            error: message.into(),
            conversation_id,
        }),
    )
}

/// Generation failures are upstream problems: 504 on timeout, 502 otherwise.
fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::Generation(GenerationError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        Error::Generation(_) | Error::Provider(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocuments {
    #[serde(default)]
    pub session_id: String,
    pub documents: Vec<SessionDocumentSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalDebugRequest {
    pub query: String,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default, alias = "audience")]
    pub audience_type: Option<AudienceType>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalDebugResponse {
    pub strategy: SearchStrategy,
    pub fallback_used: bool,
    pub fallback_reason: Option<FallbackReason>,
    pub vector_results_found: usize,
    pub text_results_found: usize,
    pub hits: Vec<HitDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitDto {
    pub id: String,
    pub document_id: String,
    pub category: ChunkCategory,
    pub score: f32,
    pub matched_by: MatchedBy,
    pub text: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn generate_handler(
    State(state): State<SharedApiState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if body.request.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "request must not be empty", None));
    }
    if body.top_k == Some(0) {
        return Err(api_error(StatusCode::BAD_REQUEST, "topK must be at least 1", None));
    }

    let conversation_id = body
        .conversation_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| ConversationId::new().to_string());
    let stored = state.conversations.get(&conversation_id).await;
    let conversation = conversation_for(&body, stored);

    let mode = GenerationMode::select(
        body.is_refinement,
        conversation.draft(),
        body.review_requested,
    );
    let request = GenerateRequest {
        request: body.request.clone(),
        content_type: body.content_type,
        audience: body.audience_type,
        mode,
        session_id: body.session_id.clone(),
        top_k: body.top_k,
    };

    info!(
        conversation_id = %conversation_id,
        mode = mode.as_str(),
        content_type = body.content_type.label(),
        history = conversation.messages.len(),
        "Generate request"
    );

    // Dropping this future on client disconnect drops the provider call.
    let cancel = CancellationToken::new();
    let response = match state.pipeline.run(&request, &conversation, &cancel).await {
        Ok(response) => response,
        Err(e) => {
            let status = error_status(&e);
            error!(conversation_id = %conversation_id, error = %e, status = status.as_u16(), "Generation failed");
            return Err(api_error(status, e.to_string(), Some(conversation_id)));
        }
    };

    state
        .conversations
        .record_turn(
            &conversation_id,
            Message::advisor(&body.request),
            Message::assistant(&response.outcome.raw_text),
            response.outcome.marketing_content.clone(),
        )
        .await;

    let attribution = response.attribution;
    let outcome = response.outcome;
    Ok(Json(GenerateResponse {
        status: "success",
        conversation_id,
        mode: response.mode,
        content: outcome.raw_text,
        marketing_content: outcome.marketing_content,
        conversational_text: outcome.conversational_text,
        well_formed: outcome.well_formed,
        diagnostics: outcome.diagnostics,
        search_strategy: attribution.strategy,
        vector_results_found: attribution.vector_results_found,
        text_results_found: attribution.text_results_found,
        total_knowledge_sources: attribution.total_sources,
        fallback_used: attribution.fallback_used,
        context_quality_score: attribution.quality_score,
        marketing_examples_count: attribution.marketing_examples_count,
        compliance_rules_count: attribution.compliance_rules_count,
        low_grounding: attribution.low_grounding,
        sources_by_category: attribution.by_category,
        context: response.context,
    }))
}

/// Merge the request with stored state into the per-call context.
///
/// Explicit request fields win: `previousContext.messages` over stored
/// history, `currentContent` over the stored draft.
fn conversation_for(body: &GenerateBody, stored: Option<StoredConversation>) -> ConversationContext {
    let (stored_messages, stored_draft) = match stored {
        Some(c) => (c.messages, c.current_draft),
        None => (Vec::new(), None),
    };
    let (messages, documents) = match &body.previous_context {
        Some(prev) => (prev.messages.clone(), prev.documents.clone()),
        None => (stored_messages, Vec::new()),
    };
    ConversationContext {
        messages,
        current_draft: body.current_content.clone().or(stored_draft),
        is_refinement: body.is_refinement,
        content_type: body.content_type,
        audience: body.audience_type,
        documents,
    }
}

async fn get_conversation_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<StoredConversation>, StatusCode> {
    state
        .conversations
        .get(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_documents_handler(
    State(state): State<SharedApiState>,
    Path(session_id): Path<String>,
    Json(body): Json<SessionDocuments>,
) -> Result<Json<SessionDocuments>, ApiError> {
    if body.documents.len() > MAX_SESSION_DOCUMENTS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("at most {MAX_SESSION_DOCUMENTS} documents per session"),
            None,
        ));
    }
    state.documents.put(&session_id, body.documents.clone()).await;
    info!(session_id = %session_id, documents = body.documents.len(), "Session documents replaced");
    Ok(Json(SessionDocuments {
        session_id,
        documents: body.documents,
    }))
}

async fn list_documents_handler(
    State(state): State<SharedApiState>,
    Path(session_id): Path<String>,
) -> Json<SessionDocuments> {
    let documents = state.documents.get(&session_id).await;
    Json(SessionDocuments {
        session_id,
        documents,
    })
}

async fn knowledge_stats_handler(State(state): State<SharedApiState>) -> Json<CorpusStats> {
    Json(state.corpus.stats().await)
}

async fn retrieval_debug_handler(
    State(state): State<SharedApiState>,
    Json(body): Json<RetrievalDebugRequest>,
) -> Response {
    let query = RetrievalQuery {
        text: body.query,
        content_type: body.content_type,
        audience: body.audience_type,
        session_id: None,
    };
    let retriever = state.pipeline.retriever();
    let top_k = body.top_k.unwrap_or(retriever.default_top_k());
    let result = retriever.retrieve(&query, top_k).await;

    Json(RetrievalDebugResponse {
        strategy: result.strategy(),
        fallback_used: result.fallback_used(),
        fallback_reason: result.path.fallback_reason(),
        vector_results_found: result.vector_found,
        text_results_found: result.lexical_found,
        hits: result
            .hits()
            .iter()
            .map(|h| HitDto {
                id: h.chunk.id.clone(),
                document_id: h.chunk.document_id.clone(),
                category: h.chunk.category,
                score: h.score,
                matched_by: h.matched_by,
                text: h.chunk.text.clone(),
            })
            .collect(),
    })
    .into_response()
}
