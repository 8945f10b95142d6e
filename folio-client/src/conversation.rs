//! Conversation state management.
//!
//! [`Conversation`] owns the session state — the documents known to the
//! session, the active document, the transcript, and the processing flag —
//! and is its sole writer. The presentation layer reads via
//! [`Conversation::snapshot`] and mutates only through the methods here.

mod state;

pub use state::{ConversationState, Document, Message, MessageRole};

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::ClientResult;

/// Shown in place of an answer when the question request fails.
const ANSWER_FAILURE_TEXT: &str =
    "Sorry, I encountered an error processing your question. Please try again.";

/// Question-answering seam between the conversation manager and the backend.
#[async_trait]
pub trait QaBackend: Send + Sync {
    /// Ask `question` about the document with `document_id`, returning the
    /// synthesized assistant message.
    async fn ask(&self, question: &str, document_id: &str) -> ClientResult<Message>;
}

/// Handle to the session's conversation state.
///
/// Cloning is cheap and every clone shares the same state, so the handle can
/// be passed into spawned tasks the way the answer continuation does below.
#[derive(Clone)]
pub struct Conversation {
    state: Arc<RwLock<ConversationState>>,
    backend: Arc<dyn QaBackend>,
    answer_tx: mpsc::UnboundedSender<Message>,
}

impl Conversation {
    /// Create a manager backed by `backend`.
    ///
    /// The returned receiver yields every assistant message as its request
    /// resolves, in completion order. Dropping the receiver is fine; answers
    /// still land in the transcript.
    pub fn new(backend: Arc<dyn QaBackend>) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (answer_tx, answer_rx) = mpsc::unbounded_channel();
        let conversation = Self {
            state: Arc::new(RwLock::new(ConversationState::default())),
            backend,
            answer_tx,
        };
        (conversation, answer_rx)
    }

    /// Current state, cloned for rendering
    pub fn snapshot(&self) -> ConversationState {
        self.state.read().unwrap().clone()
    }

    /// Append `document` to the session and make it the active document
    pub fn add_document(&self, document: Document) {
        let mut state = self.state.write().unwrap();
        state.documents.push(document.clone());
        state.active_document = Some(document);
    }

    /// Remove the document with `id` along with every message attributed to
    /// it. If the removed document was active, the first remaining document
    /// becomes active (or none when the shelf is empty). No-op for ids not
    /// in the session.
    pub fn remove_document(&self, id: &str) {
        let mut state = self.state.write().unwrap();
        if !state.documents.iter().any(|doc| doc.id == id) {
            return;
        }

        state.documents.retain(|doc| doc.id != id);
        state
            .messages
            .retain(|message| message.document_id.as_deref() != Some(id));

        if state
            .active_document
            .as_ref()
            .is_some_and(|doc| doc.id == id)
        {
            state.active_document = state.documents.first().cloned();
        }
    }

    /// Activate the document with `id`.
    ///
    /// Selection and membership are folded into one operation: when no such
    /// document is in the session the state is left untouched and `false`
    /// is returned.
    pub fn set_active_document(&self, id: &str) -> bool {
        let mut state = self.state.write().unwrap();
        match state.documents.iter().find(|doc| doc.id == id).cloned() {
            Some(document) => {
                state.active_document = Some(document);
                true
            }
            None => false,
        }
    }

    /// Append a user message and fire the answer request.
    ///
    /// Returns `false` without touching the state when no document is
    /// active. The request runs on a spawned task; the answer (or the fixed
    /// failure text if the call fails) is appended to the transcript when it
    /// resolves and is attributed to the document that was active at call
    /// time, even if the selection changes while the request is in flight.
    /// Completions apply in completion order; nothing blocks a second send
    /// while one is outstanding — gating on the processing flag is the
    /// presentation layer's job.
    pub fn send_user_message(&self, content: impl Into<String>) -> bool {
        let content = content.into();

        let document_id = {
            let mut state = self.state.write().unwrap();
            let Some(document_id) = state.active_document.as_ref().map(|doc| doc.id.clone())
            else {
                return false;
            };

            state
                .messages
                .push(Message::user(content.clone(), document_id.clone()));
            state.is_processing = true;
            document_id
        };

        debug!(document_id = %document_id, "Question dispatched");

        let conversation = self.clone();
        tokio::spawn(async move {
            let answer = match conversation.backend.ask(&content, &document_id).await {
                Ok(message) => message,
                Err(e) => {
                    error!(error = %e, document_id = %document_id, "Question request failed");
                    Message::assistant(ANSWER_FAILURE_TEXT, document_id)
                }
            };

            {
                let mut state = conversation.state.write().unwrap();
                state.messages.push(answer.clone());
                state.is_processing = false;
            }

            // Receiver may already be gone during shutdown.
            let _ = conversation.answer_tx.send(answer);
        });

        true
    }
}
