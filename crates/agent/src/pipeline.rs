//! One advisor request, end to end:
//! documents → retrieve → assemble → compose → generate → extract → attribute.
//!
//! Only the generation step can fail the call. Retrieval and document
//! lookup problems degrade and show up in the provenance instead.

use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use warren_core::generation::{
    AudienceType, ContentType, GenerationMode, GenerationOutcome, SourceAttribution,
};
use warren_core::knowledge::RetrievalQuery;
use warren_core::message::ConversationContext;
use warren_config::AppConfig;
use warren_core::error::ProviderError;
use warren_core::{CancellationToken, NoDocuments, SessionDocumentSource};
use warren_knowledge::KnowledgeCorpus;
use warren_providers::{GenerationClient, build_from_config, embedding_provider};

use crate::attribution;
use crate::context::{AssemblyMetadata, ContextAssembler};
use crate::extractor;
use crate::prompt::{ComposeRequest, PromptComposer};
use crate::retriever::HybridRetriever;

/// What the calling collaborator asks for on one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub request: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub audience: AudienceType,
    /// Chosen by the caller, see [`GenerationMode::select`]
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Overrides the configured `top_k`
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl GenerateRequest {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub mode: GenerationMode,
    pub outcome: GenerationOutcome,
    pub attribution: SourceAttribution,
    pub context: AssemblyMetadata,
}

pub struct ContentPipeline {
    retriever: HybridRetriever,
    assembler: ContextAssembler,
    composer: PromptComposer,
    generator: GenerationClient,
    documents: Arc<dyn SessionDocumentSource>,
}

impl ContentPipeline {
    pub fn new(
        retriever: HybridRetriever,
        assembler: ContextAssembler,
        generator: GenerationClient,
    ) -> Self {
        Self {
            retriever,
            assembler,
            composer: PromptComposer::new(),
            generator,
            documents: Arc::new(NoDocuments),
        }
    }

    /// Build providers, retriever, assembler, and client from configuration.
    pub fn from_config(
        config: &AppConfig,
        corpus: Arc<KnowledgeCorpus>,
    ) -> Result<Self, ProviderError> {
        let router = build_from_config(config);
        let provider = router.default().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "default provider '{}' is not configured",
                config.default_provider
            ))
        })?;
        let embedder = embedding_provider(&router, config)?;

        Ok(Self::new(
            HybridRetriever::from_config(corpus, embedder, config),
            ContextAssembler::from_config(&config.context),
            GenerationClient::from_config(provider, config),
        ))
    }

    /// Use an external Document Manager for session documents.
    pub fn with_documents(mut self, documents: Arc<dyn SessionDocumentSource>) -> Self {
        self.documents = documents;
        self
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    pub fn generator(&self) -> &GenerationClient {
        &self.generator
    }

    pub async fn run(
        &self,
        request: &GenerateRequest,
        conversation: &ConversationContext,
        cancel: &CancellationToken,
    ) -> warren_core::Result<PipelineResponse> {
        let conversation = self.with_session_documents(request, conversation).await;

        let query = RetrievalQuery {
            text: request.request.clone(),
            content_type: Some(request.content_type),
            audience: Some(request.audience),
            session_id: request.session_id.clone(),
        };
        let top_k = request.top_k.unwrap_or(self.retriever.default_top_k());
        let retrieval = self.retriever.retrieve(&query, top_k).await;

        let context = self.assembler.assemble(&retrieval, &conversation);
        let prompt = self.composer.compose(
            ComposeRequest {
                mode: request.mode,
                content_type: request.content_type,
                audience: request.audience,
                request: &request.request,
            },
            &context,
        );

        let raw = self.generator.generate(prompt.to_messages(), cancel).await?;

        let outcome = extractor::extract(&raw);
        let attribution = attribution::report(&retrieval, &context);

        info!(
            mode = request.mode.as_str(),
            strategy = attribution.strategy.as_str(),
            sources = attribution.total_sources,
            quality = attribution.quality_score,
            well_formed = outcome.well_formed,
            context_tokens = context.estimated_tokens,
            "Content generated"
        );

        Ok(PipelineResponse {
            mode: request.mode,
            outcome,
            attribution,
            context: context.metadata,
        })
    }

    /// Replace the caller's documents with the Document Manager's list for
    /// the session. A failed lookup keeps the caller's list.
    async fn with_session_documents<'c>(
        &self,
        request: &GenerateRequest,
        conversation: &'c ConversationContext,
    ) -> Cow<'c, ConversationContext> {
        let Some(session_id) = request.session_id.as_deref() else {
            return Cow::Borrowed(conversation);
        };
        match self.documents.list(session_id).await {
            Ok(documents) if documents.is_empty() => Cow::Borrowed(conversation),
            Ok(documents) => {
                let mut owned = conversation.clone();
                owned.documents = documents;
                Cow::Owned(owned)
            }
            Err(e) => {
                warn!(session_id, error = %e, "Session documents unavailable, continuing without them");
                Cow::Borrowed(conversation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::templates;
    use crate::test_helpers::{KeywordEmbedder, SequentialMockProvider, sample_corpus};
    use async_trait::async_trait;
    use warren_core::error::{Error, GenerationError};
    use warren_core::knowledge::SearchStrategy;
    use warren_core::message::{ProcessingStatus, SessionDocumentSummary};
    use warren_providers::RetryPolicy;

    const LINKEDIN_REPLY: &str = "Here's a LinkedIn post for you.\n\n\
##MARKETINGCONTENT##\n\
Planning for retirement starts with clear goals.\n\n\
Investing involves risk, including possible loss of principal. This is not investment advice.\n\
##MARKETINGCONTENT##\n\n\
Want a shorter version?";

    fn pipeline(
        corpus: Arc<KnowledgeCorpus>,
        generator: Arc<SequentialMockProvider>,
    ) -> ContentPipeline {
        let retriever = HybridRetriever::new(corpus, Arc::new(KeywordEmbedder::new()), "keyword");
        let client = GenerationClient::new(generator, "mock-model").with_retry(RetryPolicy::none());
        ContentPipeline::new(retriever, ContextAssembler::new(3000, 400), client)
    }

    fn linkedin_request() -> GenerateRequest {
        GenerateRequest {
            request: "Create a LinkedIn post about retirement planning".into(),
            content_type: ContentType::Linkedin,
            audience: AudienceType::Retirees,
            ..Default::default()
        }
    }

    struct StaticDocuments(Vec<SessionDocumentSummary>);

    #[async_trait]
    impl SessionDocumentSource for StaticDocuments {
        async fn list(&self, _session_id: &str) -> warren_core::Result<Vec<SessionDocumentSummary>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenDocuments;

    #[async_trait]
    impl SessionDocumentSource for BrokenDocuments {
        async fn list(&self, _session_id: &str) -> warren_core::Result<Vec<SessionDocumentSummary>> {
            Err(Error::Internal("document manager down".into()))
        }
    }

    #[tokio::test]
    async fn linkedin_retirement_request_is_grounded() {
        let generator = Arc::new(SequentialMockProvider::single_text(LINKEDIN_REPLY));
        let p = pipeline(sample_corpus(), generator.clone());

        let response = p
            .run(&linkedin_request(), &ConversationContext::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.attribution.strategy, SearchStrategy::Vector);
        assert!(!response.attribution.fallback_used);
        assert!(response.attribution.total_sources >= 2);
        assert!(response.outcome.well_formed);
        let content = response.outcome.marketing_content.unwrap();
        assert!(content.contains("Investing involves risk"));
        assert_eq!(response.outcome.conversational_text, "Here's a LinkedIn post for you.\n\nWant a shorter version?");

        let sent = &generator.requests()[0];
        assert!(sent.messages[0].content.contains(templates::CREATE_INSTRUCTIONS));
        assert!(sent.messages[1].content.contains("[Compliance Knowledge]"));
    }

    #[tokio::test]
    async fn empty_corpus_still_generates_with_generic_disclaimer() {
        let reply = extractor::wrap(&format!(
            "Retirement planning is a journey.\n\n{}",
            templates::GENERIC_DISCLAIMER
        ));
        let generator = Arc::new(SequentialMockProvider::single_text(&reply));
        let p = pipeline(Arc::new(KnowledgeCorpus::empty()), generator.clone());

        let response = p
            .run(&linkedin_request(), &ConversationContext::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.attribution.strategy, SearchStrategy::Text);
        assert!(response.attribution.fallback_used);
        assert_eq!(response.attribution.total_sources, 0);
        assert!(response.attribution.low_grounding);
        assert!(generator.requests()[0].messages[0]
            .content
            .contains(templates::GENERIC_DISCLAIMER));
        assert!(response
            .outcome
            .marketing_content
            .unwrap()
            .contains(templates::GENERIC_DISCLAIMER));
    }

    #[tokio::test]
    async fn refinement_uses_refine_template_and_draft() {
        let draft = "Retirement is closer than you think. Act now!";
        let reply = extractor::wrap(
            "Retirement may feel far away, but planning early can help. \
Investing involves risk, including possible loss of principal.",
        );
        let generator = Arc::new(SequentialMockProvider::single_text(&reply));
        let p = pipeline(sample_corpus(), generator.clone());

        let conversation = ConversationContext {
            current_draft: Some(draft.into()),
            is_refinement: true,
            ..Default::default()
        };
        let mut request = linkedin_request();
        request.request = "Make it less urgent".into();
        request.mode = GenerationMode::select(conversation.is_refinement, conversation.draft(), false);

        let response = p
            .run(&request, &conversation, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.mode, GenerationMode::Refine);
        let sent = &generator.requests()[0];
        assert!(sent.messages[0].content.contains(templates::REFINE_INSTRUCTIONS));
        assert!(sent.messages[1].content.contains(draft));
        let content = response.outcome.marketing_content.unwrap();
        assert_ne!(content, draft);
        assert!(!content.contains("Act now"));
    }

    #[tokio::test]
    async fn generation_failure_is_a_typed_error() {
        let generator = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::AuthenticationFailed("bad key".into()),
        )]));
        let p = pipeline(sample_corpus(), generator);
        let err = p
            .run(&linkedin_request(), &ConversationContext::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::Provider(_))));
    }

    #[tokio::test]
    async fn cancelled_before_generation_returns_cancelled() {
        let generator = Arc::new(SequentialMockProvider::single_text(LINKEDIN_REPLY));
        let p = pipeline(sample_corpus(), generator.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = p
            .run(&linkedin_request(), &ConversationContext::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::Cancelled)));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn session_documents_reach_the_prompt() {
        let generator = Arc::new(SequentialMockProvider::single_text(LINKEDIN_REPLY));
        let docs = vec![
            SessionDocumentSummary {
                document_id: "d1".into(),
                title: "Q3 outlook".into(),
                summary: "Rates expected to stay elevated".into(),
                processing_status: ProcessingStatus::Processed,
            },
            SessionDocumentSummary {
                document_id: "d2".into(),
                title: "Draft brochure".into(),
                summary: "Still extracting".into(),
                processing_status: ProcessingStatus::Processing,
            },
        ];
        let p = pipeline(sample_corpus(), generator.clone())
            .with_documents(Arc::new(StaticDocuments(docs)));
        let mut request = linkedin_request();
        request.session_id = Some("s1".into());

        p.run(&request, &ConversationContext::new(), &CancellationToken::new())
            .await
            .unwrap();

        let user = &generator.requests()[0].messages[1].content;
        assert!(user.contains("Q3 outlook"));
        assert!(!user.contains("Draft brochure"));
    }

    #[tokio::test]
    async fn document_manager_failure_degrades() {
        let generator = Arc::new(SequentialMockProvider::single_text(LINKEDIN_REPLY));
        let p = pipeline(sample_corpus(), generator).with_documents(Arc::new(BrokenDocuments));
        let mut request = linkedin_request();
        request.session_id = Some("s1".into());

        let response = p
            .run(&request, &ConversationContext::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(response.outcome.well_formed);
    }

    #[tokio::test]
    async fn from_config_uses_configured_retrieval_settings() {
        let mut config = AppConfig::default();
        config.embedding.provider = "hashing".into();
        config.retrieval.top_k = 3;
        let p = ContentPipeline::from_config(&config, Arc::new(KnowledgeCorpus::empty())).unwrap();
        assert_eq!(p.retriever().default_top_k(), 3);
        assert_eq!(p.generator().model(), config.default_model);

        config.embedding.provider = "missing".into();
        assert!(ContentPipeline::from_config(&config, Arc::new(KnowledgeCorpus::empty())).is_err());
    }

    #[tokio::test]
    async fn clarifying_question_has_no_content() {
        let generator = Arc::new(SequentialMockProvider::single_text(
            "Who is the audience for this post?",
        ));
        let p = pipeline(sample_corpus(), generator);
        let response = p
            .run(&GenerateRequest::new("Write something"), &ConversationContext::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!response.outcome.well_formed);
        assert!(response.outcome.marketing_content.is_none());
    }
}
