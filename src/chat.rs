use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: String,
}

/// The remote chat service
///
/// The trait exists so the controller can be exercised against a scripted
/// service in tests; the real implementation is `HttpChatClient`.
#[async_trait]
pub trait ChatService: Send + Sync + 'static {
    /// Send one user message and return the assistant's reply text.
    async fn send(&self, message: &str) -> Result<String>;
}

/// HTTP client for the chat endpoint
///
/// Posts `{"message": "<text>"}` to `<base>/api/chat` and expects a 2xx
/// response with body `{"response": "<text>"}`. A non-2xx response is an
/// error carrying the raw response body as its message. No timeout is set
/// and nothing is retried; a request that was issued runs to completion.
pub struct HttpChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl ChatService for HttpChatClient {
    async fn send(&self, message: &str) -> Result<String> {
        tracing::debug!("Sending chat request: {} chars", message.len());

        let response = self
            .http
            .post(&self.endpoint)
            .json(&ChatRequest { message })
            .send()
            .await
            .context("Chat request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read chat response body")?;

        if !status.is_success() {
            if body.trim().is_empty() {
                anyhow::bail!("Chat service returned {}", status);
            }
            anyhow::bail!("{}", body.trim());
        }

        let reply: ChatReply = serde_json::from_str(&body)
            .with_context(|| format!("Malformed chat response: {}", body.trim()))?;

        tracing::debug!("Chat reply received: {} chars", reply.response.len());
        Ok(reply.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let json = serde_json::to_string(&ChatRequest { message: "hello" }).unwrap();
        assert_eq!(json, r#"{"message":"hello"}"#);
    }

    #[test]
    fn reply_parses_response_field() {
        let reply: ChatReply = serde_json::from_str(r#"{"response":"hi"}"#).unwrap();
        assert_eq!(reply.response, "hi");
    }

    #[test]
    fn reply_without_response_field_is_an_error() {
        let result = serde_json::from_str::<ChatReply>(r#"{"detail":"nope"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = HttpChatClient::new("http://localhost:5000/");
        assert_eq!(client.endpoint, "http://localhost:5000/api/chat");
    }
}
