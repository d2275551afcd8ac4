use serde_json::Value;
use std::sync::Arc;

use crate::error::UpstreamError;
use crate::http_client::UpstreamHttpClient;
use crate::models::anthropic::{AnthropicMessage, MessagesRequest, ANTHROPIC_VERSION};

/// Anthropic Messages API client
pub struct AnthropicClient {
    http: Arc<UpstreamHttpClient>,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(
        http: Arc<UpstreamHttpClient>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// POST /v1/messages with a single user message
    pub async fn message(
        &self,
        model: &str,
        max_tokens: u32,
        prompt: &str,
    ) -> Result<Value, UpstreamError> {
        let request = MessagesRequest {
            model: model.to_string(),
            max_tokens,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let builder = self
            .http
            .client()
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request);

        self.http.send_json("Anthropic messages", builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_message_sends_api_key_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "ak-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_body(r#"{"content": [{"type": "text", "text": "ok"}], "stop_reason": "end_turn"}"#)
            .create_async()
            .await;

        let http = Arc::new(UpstreamHttpClient::new(4, 5, 5).unwrap());
        let client = AnthropicClient::new(http, server.url(), "ak-test");
        let body = client.message("claude-3-5-sonnet-20241022", 10, "ping").await.unwrap();

        assert_eq!(body["stop_reason"], "end_turn");
        mock.assert_async().await;
    }
}
