use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::BackendConfig;
use crate::conversation::{Document, Message, QaBackend};
use crate::error::{BackendError, ClientResult};

/// HTTP client for the document-ingestion and question-answering backend
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
}

impl BackendClient {
    /// Create a new backend client
    pub fn new(config: BackendConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::Connection {
                url: config.base_url.clone(),
                source: e,
            })?;

        Ok(Self { client, config })
    }

    /// Check if the backend is reachable
    pub async fn health_check(&self) -> ClientResult<bool> {
        let url = format!("{}/", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                warn!(error = %e, "Backend health check failed");
                Ok(false)
            }
        }
    }

    /// Upload a PDF, returning the backend-assigned document record.
    ///
    /// `ready` on the returned document reflects the backend's initial
    /// ingestion status and is not polled here.
    pub async fn upload_document(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> ClientResult<Document> {
        let url = format!("{}/documents/upload", self.config.base_url);

        let part = Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str(mime::APPLICATION_PDF.as_ref())
            .map_err(|e| BackendError::Connection {
                url: url.clone(),
                source: e,
            })?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Request { status, message }.into());
        }

        let document: DocumentResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse { source: e })?;

        Ok(document.into())
    }

    /// List all documents known to the backend
    pub async fn list_documents(&self) -> ClientResult<Vec<Document>> {
        let url = format!("{}/documents", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Request { status, message }.into());
        }

        let documents: Vec<DocumentResponse> = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse { source: e })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    /// Request deletion of a document. No local bookkeeping happens here;
    /// the conversation manager prunes its own state on success.
    pub async fn delete_document(&self, id: &str) -> ClientResult<()> {
        let url = format!("{}/documents/{}", self.config.base_url, id);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| BackendError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Request { status, message }.into());
        }

        Ok(())
    }

    /// Ask a question about a document.
    ///
    /// The assistant message is synthesized client-side; the backend only
    /// returns the answer text.
    pub async fn ask_question(&self, question: &str, document_id: &str) -> ClientResult<Message> {
        let url = format!("{}/question", self.config.base_url);

        let request = QuestionRequest {
            question: question.to_string(),
            document_id: document_id.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Request { status, message }.into());
        }

        let answer: AnswerResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse { source: e })?;

        Ok(Message::assistant(answer.answer, document_id))
    }
}

#[async_trait]
impl QaBackend for BackendClient {
    async fn ask(&self, question: &str, document_id: &str) -> ClientResult<Message> {
        self.ask_question(question, document_id).await
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct QuestionRequest {
    question: String,
    document_id: String,
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    answer: String,
}

/// Document record as the backend serializes it
#[derive(Debug, Deserialize)]
struct DocumentResponse {
    id: String,
    filename: String,
    #[serde(rename = "uploadDate")]
    upload_date: String,
    size: u64,
    ready: bool,
}

impl From<DocumentResponse> for Document {
    fn from(doc: DocumentResponse) -> Self {
        Document {
            id: doc.id,
            filename: doc.filename,
            upload_date: doc.upload_date,
            size: doc.size,
            ready: doc.ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_request_serialization() {
        let request = QuestionRequest {
            question: "What is chapter 3 about?".to_string(),
            document_id: "doc123".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["question"], "What is chapter 3 about?");
        assert_eq!(json["document_id"], "doc123");
    }

    #[test]
    fn document_response_deserialization() {
        let json = r#"{
            "id": "doc123",
            "filename": "report.pdf",
            "uploadDate": "2025-06-01T10:00:00.123456",
            "size": 48213,
            "ready": false
        }"#;

        let document: Document = serde_json::from_str::<DocumentResponse>(json).unwrap().into();
        assert_eq!(document.id, "doc123");
        assert_eq!(document.filename, "report.pdf");
        assert_eq!(document.upload_date, "2025-06-01T10:00:00.123456");
        assert_eq!(document.size, 48213);
        assert!(!document.ready);
    }

    #[test]
    fn answer_response_deserialization() {
        let json = r#"{"answer": "Chapter 3 covers revenue."}"#;
        let answer: AnswerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(answer.answer, "Chapter 3 covers revenue.");
    }
}
