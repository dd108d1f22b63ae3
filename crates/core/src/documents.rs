//! Session documents interface — the external Document Manager.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::SessionDocumentSummary;

/// Source of uploaded-document summaries for a session.
///
/// Implementations may return entries in any processing state; the
/// engine filters to processed ones itself.
#[async_trait]
pub trait SessionDocumentSource: Send + Sync {
    /// List the documents attached to a session, in upload order.
    async fn list(&self, session_id: &str) -> Result<Vec<SessionDocumentSummary>>;
}

/// A source with no documents, for deployments without a Document Manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDocuments;

#[async_trait]
impl SessionDocumentSource for NoDocuments {
    async fn list(&self, _session_id: &str) -> Result<Vec<SessionDocumentSummary>> {
        Ok(Vec::new())
    }
}
