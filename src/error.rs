// Error handling module
// Defines error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// API errors that can occur during request processing
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Request validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A required upstream credential is missing
    #[error("Configuration error: {error}")]
    NotConfigured {
        error: String,
        details: Option<String>,
    },

    /// Error reported by an upstream LLM or document API
    #[error("Upstream error: {error} (status {status})")]
    UpstreamError {
        error: String,
        status: u16,
        details: Value,
    },

    /// The LLM answered but produced nothing usable
    #[error("Empty completion: {0}")]
    EmptyCompletion(String),

    /// Request-level failure with a human readable cause
    #[error("{error}: {details}")]
    ExecutionError { error: String, details: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_configured(error: impl Into<String>) -> Self {
        ApiError::NotConfigured {
            error: error.into(),
            details: None,
        }
    }

    pub fn execution(error: impl Into<String>, details: impl Into<String>) -> Self {
        ApiError::ExecutionError {
            error: error.into(),
            details: details.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::AuthError(_) => StatusCode::UNAUTHORIZED,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotConfigured { .. }
            | ApiError::EmptyCompletion(_)
            | ApiError::UpstreamError { .. }
            | ApiError::ExecutionError { .. }
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ApiError::AuthError(msg)
            | ApiError::ValidationError(msg)
            | ApiError::EmptyCompletion(msg) => json!({ "error": msg }),
            ApiError::NotConfigured { error, details } => match details {
                Some(details) => json!({
                    "error": error,
                    "details": details,
                    "status": status.as_u16(),
                }),
                None => json!({ "error": error }),
            },
            ApiError::UpstreamError {
                error,
                status: upstream_status,
                details,
            } => json!({
                "error": error,
                "details": details,
                "status": upstream_status,
            }),
            ApiError::ExecutionError { error, details } => json!({
                "error": error,
                "details": details,
            }),
            ApiError::Internal(err) => {
                // Log internal errors
                tracing::error!("Internal error: {:?}", err);
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Errors raised while talking to an upstream API
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Upstream answered with a non-success status
    #[error("{operation} failed: {status} {reason}")]
    Status {
        operation: String,
        status: u16,
        reason: String,
        body: Value,
    },

    /// The request never produced a response
    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },

    /// The response body was not the JSON we expected
    #[error("{operation} failed: invalid JSON response: {message}")]
    Decode { operation: String, message: String },

    /// An asynchronous job reported a terminal failure
    #[error("{operation} failed: {message}")]
    Rejected { operation: String, message: String },

    /// An asynchronous job did not finish within the polling budget
    #[error("{operation} timed out after {attempts} polling attempts")]
    TimedOut { operation: String, attempts: u32 },
}

impl UpstreamError {
    /// Upstream error message, preferring `error.message` then `error.type`
    pub fn upstream_message(&self) -> String {
        match self {
            UpstreamError::Status { body, .. } => body
                .get("error")
                .and_then(|e| {
                    e.get("message")
                        .and_then(|m| m.as_str())
                        .or_else(|| e.get("type").and_then(|t| t.as_str()))
                        .or_else(|| e.as_str())
                })
                .unwrap_or("Unknown error")
                .to_string(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            UpstreamError::Status { body, .. } => body.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_messages() {
        let err = ApiError::AuthError("Invalid token".to_string());
        assert_eq!(err.to_string(), "Authentication failed: Invalid token");

        let err = ApiError::ValidationError("Missing field".to_string());
        assert_eq!(err.to_string(), "Validation error: Missing field");

        let err = ApiError::execution("Failed to execute workflow", "boom");
        assert_eq!(err.to_string(), "Failed to execute workflow: boom");
    }

    #[test]
    fn test_internal_error_message() {
        let err = ApiError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let response =
            ApiError::ValidationError("Missing or invalid description.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Missing or invalid description.");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_auth_error_response() {
        let response = ApiError::AuthError("Invalid or missing API Key".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_not_configured_response_with_details() {
        let err = ApiError::NotConfigured {
            error: "Paradigm API key not configured".to_string(),
            details: Some("Please set PARADIGM_API_KEY".to_string()),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Paradigm API key not configured");
        assert_eq!(body["details"], "Please set PARADIGM_API_KEY");
        assert_eq!(body["status"], 500);
    }

    #[tokio::test]
    async fn test_not_configured_response_without_details() {
        let response = ApiError::not_configured("OpenAI API key not set.").into_response();
        let body = body_json(response).await;
        assert_eq!(body, json!({ "error": "OpenAI API key not set." }));
    }

    #[tokio::test]
    async fn test_upstream_error_response_keeps_upstream_status_in_body() {
        let err = ApiError::UpstreamError {
            error: "OpenAI API error: Rate limit".to_string(),
            status: 429,
            details: json!({"error": {"message": "Rate limit"}}),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["status"], 429);
        assert_eq!(body["details"]["error"]["message"], "Rate limit");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = ApiError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("secret detail"));
    }

    #[test]
    fn test_upstream_status_display() {
        let err = UpstreamError::Status {
            operation: "Document search".to_string(),
            status: 404,
            reason: "Not Found".to_string(),
            body: Value::Null,
        };
        assert_eq!(err.to_string(), "Document search failed: 404 Not Found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_upstream_message_prefers_message_then_type() {
        let err = UpstreamError::Status {
            operation: "Chat completion".to_string(),
            status: 401,
            reason: "Unauthorized".to_string(),
            body: json!({"error": {"message": "Incorrect API key"}}),
        };
        assert_eq!(err.upstream_message(), "Incorrect API key");

        let err = UpstreamError::Status {
            operation: "Chat completion".to_string(),
            status: 400,
            reason: "Bad Request".to_string(),
            body: json!({"error": {"type": "invalid_request_error"}}),
        };
        assert_eq!(err.upstream_message(), "invalid_request_error");

        let err = UpstreamError::Status {
            operation: "Chat completion".to_string(),
            status: 500,
            reason: "Internal Server Error".to_string(),
            body: json!({}),
        };
        assert_eq!(err.upstream_message(), "Unknown error");
    }

    #[test]
    fn test_transport_error_body_is_message() {
        let err = UpstreamError::Transport {
            operation: "Query".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status(), None);
        assert_eq!(err.body(), json!("Query failed: connection refused"));
    }
}
