// LLM-backed workflow generation handlers

use axum::{extract::State, Json};
use serde_json::{json, Map, Value};

use super::{openai_error, AppState};
use crate::config::key_prefix;
use crate::error::ApiError;
use crate::models::workflow::{DescriptionRequest, ExecutableCodeRequest};
use crate::prompts;
use crate::template_generator::generate_workflow_with_templates;
use crate::templates::{explain_template_choice, template_suggestions, WORKFLOW_TEMPLATES};

const GENERATION_MODEL: &str = "gpt-4";
const GENERATION_TEMPERATURE: f64 = 0.3;
const GENERATION_MAX_TOKENS: u32 = 2000;
const DESCRIPTION_MAX_TOKENS: u32 = 1000;

const OPENAI_KEY_MISSING: &str = "OpenAI API key not set.";

/// A non-empty string field, or the given 400
fn required_string(value: Value, message: &str) -> Result<String, ApiError> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s),
        _ => Err(ApiError::ValidationError(message.to_string())),
    }
}

/// POST /api/generate-workflow
///
/// Asks the LLM for executable code plus a Paradigm tool config. Content
/// that is not JSON is returned raw for manual review.
pub(super) async fn generate_workflow_handler(
    State(state): State<AppState>,
    Json(request): Json<DescriptionRequest>,
) -> Result<Json<Value>, ApiError> {
    let openai = state
        .openai_client()
        .ok_or_else(|| ApiError::not_configured(OPENAI_KEY_MISSING))?;
    let description = required_string(request.description, "Missing or invalid description.")?;

    if let Some(key) = state.config.openai_api_key.as_deref() {
        tracing::info!(key = %key_prefix(key), "Calling OpenAI API for workflow generation");
    }

    let execute_url = format!("{}/api/execute-workflow", state.config.public_base_url);
    let prompt = prompts::workflow_generation(&description, &execute_url);

    let response = openai
        .complete(
            GENERATION_MODEL,
            prompts::GENERATION_SYSTEM_PROMPT,
            &prompt,
            Some(GENERATION_TEMPERATURE),
            GENERATION_MAX_TOKENS,
        )
        .await
        .map_err(|e| openai_error("OpenAI API error", "Failed to call OpenAI API", e))?;

    let content = response
        .first_content()
        .ok_or_else(|| ApiError::EmptyCompletion("No content generated from OpenAI".to_string()))?;

    tracing::debug!(content_length = content.len(), "Generated workflow content");

    match serde_json::from_str::<Value>(content) {
        Ok(parsed) => {
            let mut body = Map::new();
            for key in ["executable_code", "tool_config"] {
                if let Some(value) = parsed.get(key) {
                    body.insert(key.to_string(), value.clone());
                }
            }
            Ok(Json(Value::Object(body)))
        }
        Err(_) => {
            tracing::info!("Generated content is not JSON, returning raw response");
            Ok(Json(json!({
                "raw_response": content,
                "note": "Response could not be parsed as JSON. Please review and format manually.",
            })))
        }
    }
}

/// POST /api/generate-workflow-description
pub(super) async fn generate_description_handler(
    State(state): State<AppState>,
    Json(request): Json<ExecutableCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    let openai = state
        .openai_client()
        .ok_or_else(|| ApiError::not_configured(OPENAI_KEY_MISSING))?;
    let code = required_string(request.executable_code, "Missing or invalid executable code.")?;

    tracing::info!(code_length = code.len(), "Generating workflow description");

    let prompt = prompts::workflow_description(&code);
    let response = openai
        .complete(
            GENERATION_MODEL,
            prompts::DESCRIPTION_SYSTEM_PROMPT,
            &prompt,
            Some(GENERATION_TEMPERATURE),
            DESCRIPTION_MAX_TOKENS,
        )
        .await
        .map_err(|e| {
            openai_error(
                "OpenAI API error",
                "Failed to generate workflow description",
                e,
            )
        })?;

    let description = response
        .first_content()
        .ok_or_else(|| ApiError::EmptyCompletion("No description generated from OpenAI".to_string()))?;

    Ok(Json(json!({ "workflow_description": description.trim() })))
}

/// POST /api/generate-from-template
///
/// Works without an OpenAI key; the key is only needed to repair
/// parameters the description did not supply.
pub(super) async fn generate_from_template_handler(
    State(state): State<AppState>,
    Json(request): Json<DescriptionRequest>,
) -> Result<Json<Value>, ApiError> {
    let description = required_string(request.description, "Missing or invalid description.")?;

    tracing::info!("Request to /api/generate-from-template");

    let openai = state.openai_client();
    let result = generate_workflow_with_templates(&description, openai.as_ref()).await;

    let explanation = result
        .template
        .map(|template| explain_template_choice(template, &description));
    let suggestions: Vec<&str> = template_suggestions(&description)
        .into_iter()
        .map(|t| t.id)
        .collect();

    let mut body = serde_json::to_value(&result).map_err(anyhow::Error::from)?;
    if let Value::Object(map) = &mut body {
        map.insert("explanation".to_string(), json!(explanation));
        map.insert("suggestions".to_string(), json!(suggestions));
    }

    Ok(Json(body))
}

/// GET /api/templates
pub(super) async fn templates_handler() -> Json<Value> {
    Json(json!({ "templates": &*WORKFLOW_TEMPLATES }))
}
