//! State structures for the conversation manager.
//!
//! This module contains the in-memory session state owned by
//! [`Conversation`](super::Conversation).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document known to the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    /// Backend-assigned upload timestamp. Kept as an opaque string; the
    /// backend emits naive ISO timestamps that are not valid RFC 3339.
    pub upload_date: String,
    pub size: u64,
    /// False while the backend is still indexing the file for questions
    pub ready: bool,
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    pub timestamp: DateTime<Utc>,
    /// The document the message is about. Always set for messages created
    /// through the manager; tolerated as absent when rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl Message {
    /// Create a user message attributed to `document_id`
    pub fn user(content: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content, document_id)
    }

    /// Create an assistant message attributed to `document_id`
    pub fn assistant(content: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content, document_id)
    }

    fn with_role(
        role: MessageRole,
        content: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
            document_id: Some(document_id.into()),
        }
    }
}

/// Aggregate session state (in-memory only)
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    /// Documents in insertion order
    pub documents: Vec<Document>,
    /// Transcript in append order
    pub messages: Vec<Message>,
    /// The document new questions are about, if any
    pub active_document: Option<Document>,
    /// True while an answer request is outstanding
    pub is_processing: bool,
}
