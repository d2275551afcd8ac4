use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use crate::error::UpstreamError;

/// Shared HTTP client for all upstream APIs
///
/// Requests are sent once. Failures are reported to the caller, which
/// decides whether to record them inline or fail the request.
pub struct UpstreamHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,
}

impl UpstreamHttpClient {
    /// Create a new HTTP client
    pub fn new(max_connections: usize, connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request and decode the JSON response body
    ///
    /// `operation` names the call in error messages, e.g. "Document search".
    pub async fn send_json(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> std::result::Result<Value, UpstreamError> {
        let request = request.build().map_err(|e| UpstreamError::Transport {
            operation: operation.to_string(),
            message: format!("failed to build request: {}", e),
        })?;

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(method = %method, url = %url, "Sending upstream request");

        let response = self.client.execute(request).await.map_err(|e| {
            let error_kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connection_failed"
            } else if e.is_request() {
                "request_error"
            } else {
                "unknown"
            };

            tracing::warn!(
                error_kind = error_kind,
                error = %e,
                url = %url,
                "Upstream request error"
            );

            UpstreamError::Transport {
                operation: operation.to_string(),
                message: format!("{} (kind: {})", e, error_kind),
            }
        })?;

        let status = response.status();
        tracing::debug!(status = %status, url = %url, "Received upstream response");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

            tracing::error!(
                status = status.as_u16(),
                url = %url,
                response_body = %body,
                "Upstream request failed with error response"
            );

            return Err(UpstreamError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::Decode {
                operation: operation.to_string(),
                message: e.to_string(),
            })
    }
}
