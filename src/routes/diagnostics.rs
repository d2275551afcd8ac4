// Upstream connectivity probes

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::error::{ApiError, UpstreamError};
use crate::models::anthropic::MessagesResponse;
use crate::models::openai::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

const PROBE_PROMPT: &str = "Say \"Hello, API is working!\"";
const PROBE_MAX_TOKENS: u32 = 10;
const OPENAI_PROBE_MODEL: &str = "gpt-3.5-turbo";
const CLAUDE_PROBE_MODEL: &str = "claude-3-5-sonnet-20241022";

/// GET /api/test-openai
pub(super) async fn test_openai_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let openai = state
        .openai_client()
        .ok_or_else(|| ApiError::not_configured("OpenAI API key not set"))?;

    let request = ChatCompletionRequest {
        model: OPENAI_PROBE_MODEL.to_string(),
        messages: vec![ChatMessage::user(PROBE_PROMPT)],
        temperature: None,
        max_tokens: Some(PROBE_MAX_TOKENS),
    };

    let raw = openai
        .chat_raw(&request)
        .await
        .map_err(openai_probe_error)?;

    let parsed: ChatCompletionResponse = serde_json::from_value(raw).unwrap_or_default();
    tracing::info!("OpenAI connectivity probe succeeded");

    Ok(Json(json!({
        "success": true,
        "message": "OpenAI API is working!",
        "response": parsed.first_content(),
        "usage": parsed.usage,
    })))
}

/// Upstream failures report `error.message` only, never `error.type`
fn openai_probe_error(err: UpstreamError) -> ApiError {
    match err.status() {
        Some(status) => {
            let body = err.body();
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Unknown error");
            tracing::error!(status = status, body = %body, "OpenAI connectivity probe failed");
            ApiError::UpstreamError {
                error: format!("OpenAI API test failed: {}", message),
                status,
                details: body,
            }
        }
        None => {
            tracing::error!(error = %err, "Failed to test OpenAI API");
            ApiError::execution("Failed to test OpenAI API", err.to_string())
        }
    }
}

/// GET /api/test-claude
///
/// Anything other than `stop_reason == "end_turn"` counts as a failure.
pub(super) async fn test_claude_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let anthropic = state
        .anthropic_client()
        .ok_or_else(|| ApiError::not_configured("Anthropic API key not set"))?;

    let raw = anthropic
        .message(CLAUDE_PROBE_MODEL, PROBE_MAX_TOKENS, PROBE_PROMPT)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Claude connectivity probe failed");
            ApiError::execution("Failed to test Claude Code API", e.to_string())
        })?;

    let parsed: MessagesResponse = serde_json::from_value(raw.clone()).unwrap_or_default();

    if parsed.stop_reason.as_deref() != Some("end_turn") {
        let reason = parsed
            .stop_reason
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or("Unknown error");
        tracing::warn!(stop_reason = ?parsed.stop_reason, "Claude probe did not finish its turn");
        return Err(ApiError::UpstreamError {
            error: format!("Claude Code API test failed: {}", reason),
            status: 500,
            details: raw,
        });
    }

    tracing::info!("Claude connectivity probe succeeded");

    Ok(Json(json!({
        "success": true,
        "message": "Claude Code API is working!",
        "response": parsed.first_text(),
        "usage": parsed.usage,
    })))
}
