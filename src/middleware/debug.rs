use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

use crate::config::DebugMode;
use crate::routes::AppState;

use once_cell::sync::Lazy;

/// Global debug logger instance
pub static DEBUG_LOGGER: Lazy<DebugLogger> = Lazy::new(|| DebugLogger::new("debug_logs"));

/// Writes the last captured API exchange to disk
///
/// Modes:
/// - off: nothing is written
/// - errors: only exchanges that ended in 4xx/5xx are written
/// - all: every exchange overwrites the previous one
pub struct DebugLogger {
    debug_dir: PathBuf,
    // Serializes directory resets so concurrent requests do not interleave files
    write_lock: Mutex<()>,
}

impl DebugLogger {
    pub fn new(debug_dir: impl Into<PathBuf>) -> Self {
        Self {
            debug_dir: debug_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn debug_dir(&self) -> &PathBuf {
        &self.debug_dir
    }

    /// Persist one request/response pair according to `mode`
    pub async fn capture(
        &self,
        mode: &DebugMode,
        request_body: &Bytes,
        status: StatusCode,
        response_body: &Bytes,
    ) {
        let failed = status.is_client_error() || status.is_server_error();
        let should_write = match mode {
            DebugMode::Off => false,
            DebugMode::Errors => failed,
            DebugMode::All => true,
        };
        if !should_write {
            return;
        }

        let _guard = self.write_lock.lock().await;

        if let Err(e) = self.clear_debug_dir().await {
            tracing::warn!("[DebugLogger] Error preparing directory: {}", e);
            return;
        }

        if let Err(e) = self.write_json_file("request_body.json", request_body).await {
            tracing::warn!("[DebugLogger] Error writing request_body: {}", e);
        }

        if let Err(e) = self.write_json_file("response_body.json", response_body).await {
            tracing::warn!("[DebugLogger] Error writing response_body: {}", e);
        }

        if failed {
            let message = error_message(status, response_body);
            if let Err(e) = self.write_error_info(status.as_u16(), &message).await {
                tracing::warn!("[DebugLogger] Error writing error_info: {}", e);
            } else {
                tracing::info!(
                    "[DebugLogger] Error logs flushed to {} (status={})",
                    self.debug_dir.display(),
                    status.as_u16()
                );
            }
        }
    }

    async fn clear_debug_dir(&self) -> std::io::Result<()> {
        if self.debug_dir.exists() {
            fs::remove_dir_all(&self.debug_dir).await?;
        }
        fs::create_dir_all(&self.debug_dir).await?;
        Ok(())
    }

    /// Write a body, pretty-printed when it is JSON
    async fn write_json_file(&self, name: &str, body: &Bytes) -> std::io::Result<()> {
        let file_path = self.debug_dir.join(name);

        if let Ok(json_value) = serde_json::from_slice::<serde_json::Value>(body) {
            let pretty =
                serde_json::to_string_pretty(&json_value).map_err(std::io::Error::other)?;
            fs::write(&file_path, pretty).await?;
        } else {
            fs::write(&file_path, body).await?;
        }

        Ok(())
    }

    async fn write_error_info(&self, status_code: u16, error_message: &str) -> std::io::Result<()> {
        let file_path = self.debug_dir.join("error_info.json");

        let error_info = serde_json::json!({
            "status_code": status_code,
            "error_message": error_message
        });

        let pretty = serde_json::to_string_pretty(&error_info).map_err(std::io::Error::other)?;
        fs::write(&file_path, pretty).await?;

        Ok(())
    }
}

/// The `error` field of a JSON error body, else the status reason
fn error_message(status: StatusCode, body: &Bytes) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string())
}

/// Debug capture middleware
///
/// Buffers the request and response bodies of `/api/*` calls and hands
/// them to [`DEBUG_LOGGER`] once the handler has finished.
pub async fn debug_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if matches!(state.config.debug_mode, DebugMode::Off) {
        return next.run(request).await;
    }

    if !request.uri().path().starts_with("/api/") {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let request_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    let request = Request::from_parts(parts, Body::from(request_bytes.clone()));
    let response = next.run(request).await;

    let status = response.status();
    let (parts, body) = response.into_parts();
    let response_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!("Failed to read response body: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read response body")
                .into_response();
        }
    };

    DEBUG_LOGGER
        .capture(&state.config.debug_mode, &request_bytes, status, &response_bytes)
        .await;

    Response::from_parts(parts, Body::from(response_bytes))
}
