mod diagnostics;
mod generation;
mod workflow;

use axum::{
    middleware::{self as axum_middleware},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{ApiError, UpstreamError};
use crate::http_client::UpstreamHttpClient;
use crate::middleware;
use crate::providers::{AnthropicClient, OpenAiClient, ParadigmClient, PollSettings};

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

const PARADIGM_KEY_DETAILS: &str =
    "Please set the PARADIGM_API_KEY environment variable to use this workflow execution service.";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http_client: Arc<UpstreamHttpClient>,
}

impl AppState {
    pub fn new(config: Arc<Config>, http_client: Arc<UpstreamHttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Paradigm client, or the 500 reported when no key is configured
    pub fn paradigm_client(&self) -> Result<ParadigmClient, ApiError> {
        let api_key = self.config.paradigm_api_key.as_deref().ok_or_else(|| {
            tracing::warn!("No Paradigm API key configured");
            ApiError::NotConfigured {
                error: "Paradigm API key not configured".to_string(),
                details: Some(PARADIGM_KEY_DETAILS.to_string()),
            }
        })?;

        Ok(ParadigmClient::new(
            self.http_client.clone(),
            self.config.paradigm_base_url.as_str(),
            api_key,
            PollSettings::new(
                self.config.analysis_poll_interval_ms,
                self.config.analysis_poll_max_attempts,
            ),
        ))
    }

    pub fn openai_client(&self) -> Option<OpenAiClient> {
        self.config.openai_api_key.as_deref().map(|key| {
            OpenAiClient::new(
                self.http_client.clone(),
                self.config.openai_base_url.as_str(),
                key,
            )
        })
    }

    pub fn anthropic_client(&self) -> Option<AnthropicClient> {
        self.config.anthropic_api_key.as_deref().map(|key| {
            AnthropicClient::new(
                self.http_client.clone(),
                self.config.anthropic_base_url.as_str(),
                key,
            )
        })
    }
}

/// Map an OpenAI failure to the response body the API reports
///
/// Upstream status errors keep the upstream body and status; transport and
/// decode failures become `fallback` with the error text as details.
fn openai_error(prefix: &str, fallback: &str, err: UpstreamError) -> ApiError {
    match err.status() {
        Some(status) => {
            tracing::error!(status = status, body = %err.body(), "OpenAI API error");
            ApiError::UpstreamError {
                error: format!("{}: {}", prefix, err.upstream_message()),
                status,
                details: err.body(),
            }
        }
        None => {
            tracing::error!(error = %err, "{}", fallback);
            ApiError::execution(fallback, err.to_string())
        }
    }
}

/// Health check routes (no authentication required)
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// Workflow, generation and diagnostics routes under /api
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/execute-workflow", post(workflow::execute_workflow_handler))
        .route("/api/execute-code", post(workflow::execute_code_handler))
        .route(
            "/api/parse-workflow-code",
            post(workflow::parse_workflow_code_handler),
        )
        .route(
            "/api/generate-workflow",
            post(generation::generate_workflow_handler),
        )
        .route(
            "/api/generate-workflow-description",
            post(generation::generate_description_handler),
        )
        .route(
            "/api/generate-from-template",
            post(generation::generate_from_template_handler),
        )
        .route("/api/templates", get(generation::templates_handler))
        .route("/api/test-openai", get(diagnostics::test_openai_handler))
        .route("/api/test-claude", get(diagnostics::test_claude_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}

/// GET / - Simple health check
///
/// Returns basic status and version information.
/// This endpoint does not require authentication (for load balancers).
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Scaffold Gateway is running",
        "version": VERSION
    }))
}

/// GET /health - Detailed health check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}
