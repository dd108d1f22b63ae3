//! Conversation domain types.
//!
//! These are the value objects the calling collaborator (the session
//! manager) hands to the engine for one invocation:
//! advisor request → ConversationContext → retrieval → prompt → extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::generation::{AudienceType, ContentType};

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The financial advisor talking to Warren
    #[serde(alias = "user")]
    Advisor,
    /// Warren
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Advisor => "Advisor",
            Self::Assistant => "Warren",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    #[serde(default = "new_message_id")]
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    /// Create a new advisor message.
    pub fn advisor(content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::Advisor,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Processing state reported by the external Document Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Processed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Summary of a document the advisor uploaded into the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocumentSummary {
    pub document_id: String,
    pub title: String,
    pub summary: String,
    pub processing_status: ProcessingStatus,
}

impl SessionDocumentSummary {
    /// Only processed documents are eligible for context assembly.
    pub fn is_usable(&self) -> bool {
        self.processing_status == ProcessingStatus::Processed && !self.summary.trim().is_empty()
    }
}

/// Read-only conversation state for one engine invocation.
///
/// Owned by the session manager; the engine never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    /// Prior messages, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,

    /// The draft currently being worked on, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_draft: Option<String>,

    /// Whether the caller flagged the new request as a refinement
    #[serde(default)]
    pub is_refinement: bool,

    /// Target platform for the content
    #[serde(default)]
    pub content_type: ContentType,

    /// Intended audience
    #[serde(default)]
    pub audience: AudienceType,

    /// Session documents, in upload order
    #[serde(default)]
    pub documents: Vec<SessionDocumentSummary>,
}

impl ConversationContext {
    /// An empty context with no history, draft, or documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current draft, if one exists and is not blank.
    pub fn draft(&self) -> Option<&str> {
        self.current_draft
            .as_deref()
            .filter(|d| !d.trim().is_empty())
    }

    /// Documents eligible for context assembly, in upload order.
    pub fn usable_documents(&self) -> impl Iterator<Item = &SessionDocumentSummary> {
        self.documents.iter().filter(|d| d.is_usable())
    }
}
