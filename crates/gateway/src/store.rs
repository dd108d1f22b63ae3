//! In-memory session state owned by the gateway.
//!
//! The engine itself never holds session state; these stores stand in for
//! the external session manager and Document Manager.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use warren_core::SessionDocumentSource;
use warren_core::message::{Message, SessionDocumentSummary};

/// Maximum number of in-memory conversations before oldest are evicted.
pub const MAX_CONVERSATIONS: usize = 1_000;
/// Maximum number of sessions with stored documents.
pub const MAX_SESSIONS: usize = 1_000;
/// Maximum documents accepted for one session.
pub const MAX_SESSION_DOCUMENTS: usize = 200;
/// Stored messages kept per conversation; older ones are dropped first.
pub const MAX_MESSAGES_PER_CONVERSATION: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConversation {
    pub id: String,
    pub messages: Vec<Message>,
    /// Latest extracted marketing content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_draft: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredConversation {
    fn new(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            messages: Vec::new(),
            current_draft: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Bounded conversation history keyed by conversation id.
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, StoredConversation>>,
    capacity: usize,
    max_messages: usize,
}

impl ConversationStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            max_messages: MAX_MESSAGES_PER_CONVERSATION,
        }
    }

    /// Cap the stored history per conversation. Always keeps at least one
    /// full exchange.
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages.max(2);
        self
    }

    pub async fn get(&self, id: &str) -> Option<StoredConversation> {
        self.conversations.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    /// Append one advisor/assistant exchange. A new draft replaces the old
    /// one; `None` keeps it.
    pub async fn record_turn(
        &self,
        id: &str,
        advisor: Message,
        assistant: Message,
        draft: Option<String>,
    ) {
        let mut conversations = self.conversations.write().await;

        if !conversations.contains_key(id) && conversations.len() >= self.capacity {
            if let Some(oldest) = conversations
                .iter()
                .min_by_key(|(_, c)| c.updated_at)
                .map(|(k, _)| k.clone())
            {
                debug!(conversation_id = %oldest, "Evicting oldest conversation");
                conversations.remove(&oldest);
            }
        }

        let conversation = conversations
            .entry(id.to_string())
            .or_insert_with(|| StoredConversation::new(id));
        conversation.messages.push(advisor);
        conversation.messages.push(assistant);
        let excess = conversation.messages.len().saturating_sub(self.max_messages);
        if excess > 0 {
            conversation.messages.drain(..excess);
        }
        if draft.is_some() {
            conversation.current_draft = draft;
        }
        conversation.updated_at = Utc::now();
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(MAX_CONVERSATIONS)
    }
}

struct SessionEntry {
    documents: Vec<SessionDocumentSummary>,
    /// Write sequence number; the smallest is the least recently written.
    written: u64,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<String, SessionEntry>,
    next_write: u64,
}

/// Document Manager stand-in: per-session summary lists, replaced whole.
/// Bounded; the least recently written session is evicted first.
pub struct SessionDocumentStore {
    sessions: RwLock<Sessions>,
    capacity: usize,
}

impl SessionDocumentStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
            capacity: capacity.max(1),
        }
    }

    /// Replace the session's list.
    pub async fn put(&self, session_id: &str, documents: Vec<SessionDocumentSummary>) {
        let mut sessions = self.sessions.write().await;

        if !sessions.entries.contains_key(session_id) && sessions.entries.len() >= self.capacity {
            if let Some(oldest) = sessions
                .entries
                .iter()
                .min_by_key(|(_, e)| e.written)
                .map(|(k, _)| k.clone())
            {
                debug!(session_id = %oldest, "Evicting least recently written session");
                sessions.entries.remove(&oldest);
            }
        }

        let written = sessions.next_write;
        sessions.next_write += 1;
        sessions
            .entries
            .insert(session_id.to_string(), SessionEntry { documents, written });
    }

    pub async fn get(&self, session_id: &str) -> Vec<SessionDocumentSummary> {
        self.sessions
            .read()
            .await
            .entries
            .get(session_id)
            .map(|e| e.documents.clone())
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.entries.len()
    }
}

impl Default for SessionDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionDocumentSource for SessionDocumentStore {
    async fn list(&self, session_id: &str) -> warren_core::Result<Vec<SessionDocumentSummary>> {
        Ok(self.get(session_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warren_core::message::ProcessingStatus;

    #[tokio::test]
    async fn record_turn_appends_and_keeps_draft() {
        let store = ConversationStore::default();
        store
            .record_turn("c1", Message::advisor("a"), Message::assistant("b"), Some("draft".into()))
            .await;
        store
            .record_turn("c1", Message::advisor("c"), Message::assistant("d"), None)
            .await;

        let c = store.get("c1").await.unwrap();
        assert_eq!(c.messages.len(), 4);
        assert_eq!(c.current_draft.as_deref(), Some("draft"));
    }

    #[tokio::test]
    async fn oldest_conversation_is_evicted_at_capacity() {
        let store = ConversationStore::new(2);
        for id in ["a", "b", "c"] {
            store
                .record_turn(id, Message::advisor("q"), Message::assistant("r"), None)
                .await;
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert_eq!(store.len().await, 2);
        assert!(store.get("a").await.is_none());
        assert!(store.get("c").await.is_some());
    }

    #[tokio::test]
    async fn document_store_serves_as_source() {
        let store = SessionDocumentStore::new();
        assert!(store.list("s1").await.unwrap().is_empty());

        let docs = vec![SessionDocumentSummary {
            document_id: "d1".into(),
            title: "Fee schedule".into(),
            summary: "Advisory fees by tier".into(),
            processing_status: ProcessingStatus::Processed,
        }];
        store.put("s1", docs.clone()).await;
        assert_eq!(store.list("s1").await.unwrap(), docs);
    }

    #[tokio::test]
    async fn history_is_capped_from_the_front() {
        let store = ConversationStore::new(10).with_max_messages(6);
        for i in 0..50 {
            store
                .record_turn(
                    "long",
                    Message::advisor(format!("q{i}")),
                    Message::assistant(format!("r{i}")),
                    None,
                )
                .await;
        }

        let c = store.get("long").await.unwrap();
        assert_eq!(c.messages.len(), 6);
        assert_eq!(c.messages[0].content, "q47");
        assert_eq!(c.messages[5].content, "r49");
    }

    #[tokio::test]
    async fn default_history_cap_applies() {
        let store = ConversationStore::default();
        for _ in 0..MAX_MESSAGES_PER_CONVERSATION {
            store
                .record_turn("c", Message::advisor("q"), Message::assistant("r"), None)
                .await;
        }
        let c = store.get("c").await.unwrap();
        assert_eq!(c.messages.len(), MAX_MESSAGES_PER_CONVERSATION);
    }

    #[tokio::test]
    async fn full_document_store_evicts_least_recently_written() {
        let store = SessionDocumentStore::with_capacity(3);
        for id in ["s1", "s2", "s3"] {
            store.put(id, Vec::new()).await;
        }
        // Rewriting s1 makes s2 the oldest.
        store.put("s1", Vec::new()).await;
        store.put("fresh-session", Vec::new()).await;

        assert_eq!(store.len().await, 3);
        let s = store.sessions.read().await;
        assert!(s.entries.contains_key("fresh-session"));
        assert!(s.entries.contains_key("s1"));
        assert!(!s.entries.contains_key("s2"));
    }

    #[tokio::test]
    async fn new_sessions_accepted_after_default_capacity() {
        let store = SessionDocumentStore::new();
        for i in 0..MAX_SESSIONS {
            store.put(&format!("session-{i}"), Vec::new()).await;
        }
        let doc = SessionDocumentSummary {
            document_id: "d1".into(),
            title: "ADV Part 2A".into(),
            summary: "Brochure".into(),
            processing_status: ProcessingStatus::Processed,
        };
        store.put("fresh-session", vec![doc]).await;

        assert_eq!(store.len().await, MAX_SESSIONS);
        assert_eq!(store.get("fresh-session").await.len(), 1);
        assert!(store.get("session-0").await.is_empty());
    }
}
