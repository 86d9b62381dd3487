//! Remote assistant endpoint client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::{BackendError, BackendResult};

/// The seam the request coordinator talks through.
///
/// One call per accepted send; the implementation carries no retry or
/// timeout logic of its own.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Relay one user message and return the assistant reply text.
    async fn send_message(&self, session_id: &str, message: &str) -> BackendResult<String>;
}

/// Outbound request body for `POST /chat`
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
}

/// Expected success response body
#[derive(Debug, Deserialize)]
struct ChatResponse {
    reply: String,
}

/// HTTP client against the remote assistant endpoint
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(&self, session_id: &str, message: &str) -> BackendResult<String> {
        let url = format!("{}/chat", self.base_url.trim_end_matches('/'));

        debug!("Sending chat request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                session_id,
                message,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(BackendError::Api(format!(
                "Chat API error {}: {}",
                status, error_text
            )));
        }

        // A body that cannot be parsed or lacks `reply` is an error too;
        // the coordinator treats it the same as any other failure.
        let chat_response: ChatResponse = response.json().await?;

        Ok(chat_response.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ChatRequest {
            session_id: "abc-123",
            message: "Hello",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"session_id": "abc-123", "message": "Hello"})
        );
    }

    #[test]
    fn test_response_wire_format() {
        let response: ChatResponse = serde_json::from_str(r#"{"reply":"Hi there"}"#).unwrap();
        assert_eq!(response.reply, "Hi there");
    }

    #[test]
    fn test_response_missing_reply_is_an_error() {
        let result = serde_json::from_str::<ChatResponse>(r#"{"answer":"Hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_creation() {
        let backend = HttpBackend::new("http://localhost:8000");
        assert_eq!(backend.base_url(), "http://localhost:8000");
    }
}
