use serde_json::Value;
use std::sync::Arc;

use crate::error::UpstreamError;
use crate::http_client::UpstreamHttpClient;
use crate::models::openai::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// OpenAI chat completions client
pub struct OpenAiClient {
    http: Arc<UpstreamHttpClient>,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
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

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// POST /v1/chat/completions, returning the raw response body
    pub async fn chat_raw(&self, request: &ChatCompletionRequest) -> Result<Value, UpstreamError> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Calling OpenAI chat completions"
        );

        let builder = self
            .http
            .client()
            .post(self.chat_completions_url())
            .bearer_auth(&self.api_key)
            .json(request);

        self.http.send_json("OpenAI chat completion", builder).await
    }

    /// POST /v1/chat/completions with a system and a user message
    pub async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: Option<f64>,
        max_tokens: u32,
    ) -> Result<ChatCompletionResponse, UpstreamError> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature,
            max_tokens: Some(max_tokens),
        };

        let raw = self.chat_raw(&request).await?;
        serde_json::from_value::<ChatCompletionResponse>(raw).map_err(|e| UpstreamError::Decode {
            operation: "OpenAI chat completion".to_string(),
            message: e.to_string(),
        })
    }
}
