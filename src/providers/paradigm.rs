// Paradigm document and chat API client

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::UpstreamError;
use crate::http_client::UpstreamHttpClient;
use crate::models::paradigm::{
    analysis_job_id, AnalysisRequest, AnalysisStatus, ChatCompletionRequest,
    DocumentSearchRequest, QueryRequest,
};

/// Fixed-count polling schedule for asynchronous analysis jobs
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn new(interval_ms: u64, max_attempts: u32) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            max_attempts,
        }
    }
}

/// Client for the Paradigm REST API
pub struct ParadigmClient {
    http: Arc<UpstreamHttpClient>,
    base_url: String,
    api_key: String,
    poll: PollSettings,
}

impl ParadigmClient {
    pub fn new(
        http: Arc<UpstreamHttpClient>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        poll: PollSettings,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            poll,
        }
    }

    /// POST /chat/document-search
    pub async fn document_search(
        &self,
        request: &DocumentSearchRequest,
    ) -> Result<Value, UpstreamError> {
        self.post("Document search", "/chat/document-search", request)
            .await
    }

    /// POST /chat/document-analysis, then poll the job until it settles
    pub async fn document_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Value, UpstreamError> {
        const OPERATION: &str = "Document analysis";

        let initial = self
            .post(OPERATION, "/chat/document-analysis", request)
            .await?;

        if let AnalysisStatus::Failed(detail) = AnalysisStatus::of(&initial) {
            return Err(UpstreamError::Rejected {
                operation: OPERATION.to_string(),
                message: detail,
            });
        }

        let settled = initial.get("status").is_some()
            && AnalysisStatus::of(&initial) == AnalysisStatus::Completed;
        match analysis_job_id(&initial) {
            Some(job_id) if !settled => self.poll_analysis(OPERATION, &job_id).await,
            _ => Ok(initial),
        }
    }

    /// POST /chat/image-analysis
    pub async fn image_analysis(&self, request: &AnalysisRequest) -> Result<Value, UpstreamError> {
        self.post("Image analysis", "/chat/image-analysis", request)
            .await
    }

    /// POST /query
    pub async fn query(&self, request: &QueryRequest) -> Result<Value, UpstreamError> {
        self.post("Query", "/query", request).await
    }

    /// POST /chat/completions
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<Value, UpstreamError> {
        self.post("Chat completion", "/chat/completions", request)
            .await
    }

    async fn poll_analysis(&self, operation: &str, job_id: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/chat/document-analysis/{}", self.base_url, job_id);

        for attempt in 1..=self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;

            tracing::debug!(
                job_id = job_id,
                attempt = attempt,
                max_attempts = self.poll.max_attempts,
                "Polling document analysis"
            );

            let request = self.http.client().get(&url).bearer_auth(&self.api_key);
            let body = self.http.send_json(operation, request).await?;

            match AnalysisStatus::of(&body) {
                AnalysisStatus::Completed => {
                    tracing::info!(job_id = job_id, attempts = attempt, "Document analysis completed");
                    return Ok(body);
                }
                AnalysisStatus::Failed(detail) => {
                    return Err(UpstreamError::Rejected {
                        operation: operation.to_string(),
                        message: detail,
                    });
                }
                AnalysisStatus::Pending => {}
            }
        }

        tracing::warn!(
            job_id = job_id,
            attempts = self.poll.max_attempts,
            "Document analysis did not finish in time"
        );

        Err(UpstreamError::TimedOut {
            operation: operation.to_string(),
            attempts: self.poll.max_attempts,
        })
    }

    async fn post<T: Serialize>(
        &self,
        operation: &str,
        path: &str,
        body: &T,
    ) -> Result<Value, UpstreamError> {
        let request = self
            .http
            .client()
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body);

        self.http.send_json(operation, request).await
    }
}
