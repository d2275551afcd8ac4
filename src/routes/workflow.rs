// Workflow execution and code parsing handlers

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::code_parser::{parse_workflow_code, validate_parsed};
use crate::error::ApiError;
use crate::models::workflow::{
    ExecutableCodeRequest, ExecuteWorkflowRequest, ExecutionEnvelope, ParseCodeRequest,
};
use crate::workflow::WorkflowExecutor;

/// POST /api/execute-workflow
///
/// `parameters` may arrive as a JSON string; Paradigm's tool runner sends
/// it that way.
pub(super) async fn execute_workflow_handler(
    State(state): State<AppState>,
    Json(request): Json<ExecuteWorkflowRequest>,
) -> Result<Json<ExecutionEnvelope>, ApiError> {
    tracing::info!(
        workflow_type = request.workflow_type.as_deref().unwrap_or("(none)"),
        "Request to /api/execute-workflow"
    );

    let parameters = match request.parameters {
        Value::String(raw) => serde_json::from_str::<Value>(&raw).map_err(|e| {
            tracing::warn!(error = %e, "Parameters string is not valid JSON");
            ApiError::ValidationError("Invalid parameters: could not parse JSON string.".to_string())
        })?,
        other => other,
    };

    run_workflow(&state, request.workflow_type, parameters).await
}

/// POST /api/execute-code - parse generated code and execute it in-process
pub(super) async fn execute_code_handler(
    State(state): State<AppState>,
    Json(request): Json<ExecutableCodeRequest>,
) -> Result<Json<ExecutionEnvelope>, ApiError> {
    let code = match request.executable_code {
        Value::String(code) if !code.is_empty() => code,
        _ => {
            return Err(ApiError::ValidationError(
                "Missing or invalid executable code.".to_string(),
            ))
        }
    };

    tracing::info!(code_length = code.len(), "Request to /api/execute-code");

    let parsed = parse_workflow_code(&code);
    let validation = validate_parsed(&parsed);
    if !validation.is_valid {
        let reason = validation.error.unwrap_or_default();
        tracing::warn!(reason = %reason, "Generated code is not an executable workflow");
        return Err(ApiError::ValidationError(format!("Invalid workflow: {}", reason)));
    }

    run_workflow(&state, Some(parsed.workflow_type), parsed.parameters).await
}

/// POST /api/parse-workflow-code
pub(super) async fn parse_workflow_code_handler(
    Json(request): Json<ParseCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    let code = match request.code {
        Value::String(code) => code,
        _ => return Err(ApiError::ValidationError("Missing or invalid code.".to_string())),
    };

    let parsed = parse_workflow_code(&code);
    let validation = validate_parsed(&parsed);

    Ok(Json(json!({
        "parsed": parsed,
        "validation": validation,
    })))
}

async fn run_workflow(
    state: &AppState,
    workflow_type: Option<String>,
    parameters: Value,
) -> Result<Json<ExecutionEnvelope>, ApiError> {
    let paradigm = state.paradigm_client()?;

    tracing::debug!(
        parameters = %parameters,
        "Executing workflow"
    );

    let executor = WorkflowExecutor::new(paradigm);
    let outcome = executor
        .execute(workflow_type.as_deref(), &parameters)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Error executing workflow");
            ApiError::execution("Failed to execute workflow", e.to_string())
        })?;

    tracing::info!(
        workflow_type = workflow_type.as_deref().unwrap_or("(none)"),
        "Workflow executed"
    );

    Ok(Json(ExecutionEnvelope::new(
        workflow_type,
        outcome.result,
        outcome.explanation,
    )))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::api_routes;
    use axum::{body::Body, http::Request, http::StatusCode};
    use serde_json::json;
    use tower::util::ServiceExt;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_execute_workflow_with_string_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/document-search")
            .match_header("authorization", "Bearer pk-test")
            .with_status(200)
            .with_body(r#"{"answer": "Paris"}"#)
            .create_async()
            .await;

        let app = api_routes(create_test_state(&server.url()));
        let request = post_json(
            "/api/execute-workflow",
            json!({
                "workflow_type": "document_search",
                "parameters": "{\"query\": \"capital of France\"}"
            }),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = parse_json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["workflow_type"], "document_search");
        assert_eq!(body["result"]["result"]["answer"], "Paris");
        assert!(body["executed_at"].as_str().unwrap().ends_with('Z'));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_workflow_rejects_bad_parameter_string() {
        let app = api_routes(create_test_state("http://127.0.0.1:9"));
        let request = post_json(
            "/api/execute-workflow",
            json!({"workflow_type": "document_search", "parameters": "{not json"}),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json_body(response).await;
        assert_eq!(body["error"], "Invalid parameters: could not parse JSON string.");
    }

    #[tokio::test]
    async fn test_execute_workflow_without_paradigm_key() {
        let app = api_routes(create_keyless_state());
        let request = post_json("/api/execute-workflow", json!({"parameters": {"query": "q"}}));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = parse_json_body(response).await;
        assert_eq!(body["error"], "Paradigm API key not configured");
    }

    #[tokio::test]
    async fn test_execute_workflow_dispatch_error() {
        let app = api_routes(create_test_state("http://127.0.0.1:9"));
        let request = post_json("/api/execute-workflow", json!({"parameters": {"foo": 1}}));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = parse_json_body(response).await;
        assert_eq!(body["error"], "Failed to execute workflow");
        assert!(body["details"]
            .as_str()
            .unwrap()
            .starts_with("Unable to determine workflow operation type"));
    }

    #[tokio::test]
    async fn test_execute_code_runs_parsed_workflow() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/document-search")
            .with_status(200)
            .with_body(r#"{"answer": "42"}"#)
            .create_async()
            .await;

        let app = api_routes(create_test_state(&server.url()));
        let request = post_json(
            "/api/execute-code",
            json!({"executableCode": "fetch(url, { body: JSON.stringify({ workflow_type: 'document_search', parameters: JSON.stringify({ query: 'meaning' }) }) })"}),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_json_body(response).await;
        assert_eq!(body["workflow_type"], "document_search");
        assert_eq!(body["result"]["result"]["answer"], "42");
    }

    #[tokio::test]
    async fn test_execute_code_invalid_workflow() {
        let app = api_routes(create_test_state("http://127.0.0.1:9"));
        let request = post_json(
            "/api/execute-code",
            json!({"executableCode": "workflow_type: 'translate', parameters: { text: 'hi' }"}),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json_body(response).await;
        assert_eq!(body["error"], "Invalid workflow: Unsupported workflow type: translate");
    }

    #[tokio::test]
    async fn test_parse_workflow_code() {
        let app = api_routes(create_test_state("http://127.0.0.1:9"));
        let request = post_json(
            "/api/parse-workflow-code",
            json!({"code": "executeWorkflow('First question? Second one.')"}),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_json_body(response).await;
        assert_eq!(body["parsed"]["workflow_type"], "multi_sentence_workflow");
        assert_eq!(body["parsed"]["parameters"]["user_input"], "First question? Second one.");
        assert_eq!(body["validation"]["is_valid"], true);
    }
}
