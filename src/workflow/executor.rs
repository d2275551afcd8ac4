// Sequential workflow interpreter

use serde_json::{json, Map, Value};

use super::context::WorkflowContext;
use super::multi_sentence;
use super::step::{step_name, StepKind};
use super::{StepError, WorkflowError, MULTI_SENTENCE_WORKFLOW};
use crate::models::paradigm::{
    AnalysisRequest, ChatCompletionRequest, DocumentSearchRequest, QueryRequest,
};
use crate::models::workflow::StepRecord;
use crate::providers::ParadigmClient;

const WEB_SEARCH_UNAVAILABLE: &str =
    "Web search is not available through the Paradigm API; this step was skipped.";

/// Result of running a workflow, before it is wrapped in the response envelope
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub result: Value,
    pub explanation: String,
}

/// What a single step produced
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Completed(Value),
    /// The step kind exists but cannot be served; carries the reason
    Unavailable(String),
}

/// Executes workflows against the Paradigm API
pub struct WorkflowExecutor {
    paradigm: ParadigmClient,
}

impl WorkflowExecutor {
    pub fn new(paradigm: ParadigmClient) -> Self {
        Self { paradigm }
    }

    /// Run a workflow described by `workflow_type` and its parameter object
    pub async fn execute(
        &self,
        workflow_type: Option<&str>,
        parameters: &Value,
    ) -> Result<ExecutionOutcome, WorkflowError> {
        let params = parameters
            .as_object()
            .ok_or(WorkflowError::InvalidParameters)?;

        if workflow_type == Some(MULTI_SENTENCE_WORKFLOW) {
            if let Some(user_input) = params.get("user_input").and_then(|v| v.as_str()) {
                return Ok(multi_sentence::run(&self.paradigm, user_input).await);
            }
        }

        self.execute_dynamic(params).await
    }

    /// Steps array, then a single typed operation, then an inferred search
    async fn execute_dynamic(
        &self,
        params: &Map<String, Value>,
    ) -> Result<ExecutionOutcome, WorkflowError> {
        let mut context = WorkflowContext::from_parameters(params);

        if let Some(Value::Array(steps)) = params.get("steps") {
            return Ok(self.execute_steps(steps, context).await);
        }

        if params.contains_key("type") || params.contains_key("operation") {
            let resolved = resolve_step(&context, params);
            let outcome = self
                .execute_step(&resolved)
                .await
                .map_err(|e| WorkflowError::SingleOperation(e.to_string()))?;

            let (result, explanation) = match outcome {
                StepOutcome::Completed(value) => (value, String::new()),
                StepOutcome::Unavailable(reason) => (Value::Null, reason),
            };

            return Ok(ExecutionOutcome {
                result: json!({ "result": result, "context": context.into_value() }),
                explanation,
            });
        }

        if params.contains_key("query") {
            tracing::debug!("No steps or type given, treating parameters as a document search");
            let resolved = resolve_step(&context, params);
            let result = self
                .paradigm
                .document_search(&DocumentSearchRequest::from_step(&resolved))
                .await
                .map_err(|e| WorkflowError::DocumentSearch(e.to_string()))?;

            context.insert("document_search", result.clone());

            return Ok(ExecutionOutcome {
                result: json!({ "result": result, "context": context.into_value() }),
                explanation: String::new(),
            });
        }

        Err(WorkflowError::UndeterminedOperation)
    }

    /// Run every step in order; failures are recorded and the loop continues
    async fn execute_steps(&self, steps: &[Value], mut context: WorkflowContext) -> ExecutionOutcome {
        let mut records = Vec::with_capacity(steps.len());
        let mut explanation = String::new();
        let empty = Map::new();

        for (index, raw_step) in steps.iter().enumerate() {
            let step = raw_step.as_object().unwrap_or(&empty);
            let name = step_name(step, index);
            let resolved = resolve_step(&context, step);

            tracing::info!(step = %name, index = index, "Executing workflow step");

            match self.execute_step(&resolved).await {
                Ok(StepOutcome::Completed(result)) => {
                    context.insert(name.clone(), result.clone());
                    records.push(StepRecord::completed(name, result));
                }
                Ok(StepOutcome::Unavailable(reason)) => {
                    explanation.push_str(&format!("Step '{}': {}\n", name, reason));
                    records.push(StepRecord::skipped(name, reason));
                }
                Err(e) => {
                    tracing::warn!(step = %name, error = %e, "Workflow step failed");
                    let message = format!("Failed with error: {}", e);
                    explanation.push_str(&format!("Step '{}': {}\n", name, message));
                    records.push(StepRecord::skipped(name, message));
                }
            }
        }

        ExecutionOutcome {
            result: json!({
                "workflow_results": records,
                "final_context": context.into_value(),
                "explanation": explanation,
            }),
            explanation,
        }
    }

    /// Dispatch one step to its endpoint
    pub async fn execute_step(
        &self,
        step: &Map<String, Value>,
    ) -> Result<StepOutcome, StepError> {
        let kind = StepKind::of(step);
        tracing::debug!(kind = %kind, "Dispatching step");

        let value = match kind {
            StepKind::DocumentSearch => {
                self.paradigm
                    .document_search(&DocumentSearchRequest::from_step(step))
                    .await?
            }
            StepKind::DocumentAnalysis => {
                self.paradigm
                    .document_analysis(&AnalysisRequest::from_step(step))
                    .await?
            }
            StepKind::ImageAnalysis => {
                self.paradigm
                    .image_analysis(&AnalysisRequest::from_step(step))
                    .await?
            }
            StepKind::Query => self.paradigm.query(&QueryRequest::from_step(step)).await?,
            StepKind::ChatCompletion => {
                self.paradigm
                    .chat_completion(&ChatCompletionRequest::from_step(step))
                    .await?
            }
            StepKind::WebSearch => {
                return Ok(StepOutcome::Unavailable(WEB_SEARCH_UNAVAILABLE.to_string()))
            }
            unknown @ StepKind::Unknown(_) => {
                return Err(StepError::Unsupported(unknown.to_string()))
            }
        };

        Ok(StepOutcome::Completed(value))
    }
}

/// Apply context placeholders to every string in a step
fn resolve_step(context: &WorkflowContext, step: &Map<String, Value>) -> Map<String, Value> {
    match context.resolve(&Value::Object(step.clone())) {
        Value::Object(map) => map,
        _ => step.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::UpstreamHttpClient;
    use crate::providers::PollSettings;
    use mockito::Matcher;
    use std::sync::Arc;

    fn executor_for(server: &mockito::ServerGuard) -> WorkflowExecutor {
        let http = Arc::new(UpstreamHttpClient::new(4, 5, 5).unwrap());
        WorkflowExecutor::new(ParadigmClient::new(
            http,
            server.url(),
            "pk-test",
            PollSettings::new(5, 2),
        ))
    }

    #[tokio::test]
    async fn test_multi_step_records_results_and_context() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/document-search")
            .with_status(200)
            .with_body(r#"{"answer": "Q3 revenue grew", "documents": [{"id": 11}]}"#)
            .create_async()
            .await;
        let analysis = server
            .mock("POST", "/chat/document-analysis")
            .match_body(Matcher::Json(json!({
                "query": "Explain: Q3 revenue grew",
                "document_ids": [{"id": 11}],
                "model": "alfred-4.2"
            })))
            .with_status(200)
            .with_body(r#"{"result": "analysis done"}"#)
            .create_async()
            .await;

        let executor = executor_for(&server);
        let params = json!({
            "steps": [
                {"name": "search", "type": "document_search", "query": "revenue"},
                {
                    "type": "document_analysis",
                    "query": "Explain: {{search.answer}}",
                    "document_ids": "{{search.documents}}"
                }
            ]
        });

        let outcome = executor
            .execute(Some("multi_step_workflow"), &params)
            .await
            .unwrap();

        let results = outcome.result["workflow_results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["step"], "search");
        assert_eq!(results[1]["step"], "document_analysis");
        assert_eq!(results[1]["result"]["result"], "analysis done");
        assert_eq!(
            outcome.result["final_context"]["search"]["answer"],
            "Q3 revenue grew"
        );
        assert_eq!(outcome.explanation, "");
        analysis.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_and_unknown_steps_do_not_abort() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query")
            .with_status(502)
            .create_async()
            .await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"content": "done"}}]}"#)
            .create_async()
            .await;

        let executor = executor_for(&server);
        let params = json!({
            "steps": [
                {"type": "query", "query": "q"},
                {"type": "translate"},
                {"type": "websearch", "query": "news"},
                {"name": "answer", "type": "chat", "messages": []}
            ]
        });

        let outcome = executor.execute(None, &params).await.unwrap();
        let results = outcome.result["workflow_results"].as_array().unwrap();

        assert_eq!(results.len(), 4);
        assert!(results[0]["result"].is_null());
        assert_eq!(
            results[0]["explanation"],
            "Failed with error: Query failed: 502 Bad Gateway"
        );
        assert_eq!(
            results[1]["explanation"],
            "Failed with error: Unknown or unsupported step type: translate"
        );
        assert_eq!(results[2]["explanation"], WEB_SEARCH_UNAVAILABLE);
        assert_eq!(results[3]["result"]["choices"][0]["message"]["content"], "done");

        let expected = format!(
            "Step 'query': Failed with error: Query failed: 502 Bad Gateway\n\
             Step 'translate': Failed with error: Unknown or unsupported step type: translate\n\
             Step 'websearch': {}\n",
            WEB_SEARCH_UNAVAILABLE
        );
        assert_eq!(outcome.explanation, expected);
        assert_eq!(outcome.result["explanation"], expected);

        let context = outcome.result["final_context"].as_object().unwrap();
        assert!(context.contains_key("answer"));
        assert!(!context.contains_key("query"));
    }

    #[tokio::test]
    async fn test_initial_context_is_carried() {
        let server = mockito::Server::new_async().await;
        let executor = executor_for(&server);
        let params = json!({"steps": [], "context": {"user": "ana"}});

        let outcome = executor.execute(None, &params).await.unwrap();
        assert_eq!(outcome.result["final_context"], json!({"user": "ana"}));
        assert_eq!(outcome.result["workflow_results"], json!([]));
    }

    #[tokio::test]
    async fn test_single_operation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/image-analysis")
            .with_status(200)
            .with_body(r#"{"answer": "a cat"}"#)
            .create_async()
            .await;

        let executor = executor_for(&server);
        let params = json!({"operation": "imageanalysis", "query": "what is it", "document_ids": [3]});

        let outcome = executor.execute(Some("image_analysis"), &params).await.unwrap();
        assert_eq!(outcome.result["result"]["answer"], "a cat");
        assert_eq!(outcome.result["context"], json!({}));
    }

    #[tokio::test]
    async fn test_single_operation_failure() {
        let server = mockito::Server::new_async().await;
        let executor = executor_for(&server);
        let params = json!({"type": "summarize"});

        let err = executor.execute(None, &params).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Single operation failed: Unknown or unsupported step type: summarize"
        );
    }

    #[tokio::test]
    async fn test_query_only_parameters_run_document_search() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/document-search")
            .match_body(Matcher::PartialJson(json!({"query": "holiday policy"})))
            .with_status(200)
            .with_body(r#"{"answer": "25 days"}"#)
            .create_async()
            .await;

        let executor = executor_for(&server);
        let outcome = executor
            .execute(Some("document_search"), &json!({"query": "holiday policy"}))
            .await
            .unwrap();

        assert_eq!(outcome.result["result"]["answer"], "25 days");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_only_failure_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/document-search")
            .with_status(401)
            .create_async()
            .await;

        let executor = executor_for(&server);
        let err = executor
            .execute(None, &json!({"query": "x"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Document search failed: Document search failed: 401 Unauthorized"
        );
    }

    #[tokio::test]
    async fn test_single_web_search_is_reported_unavailable() {
        let server = mockito::Server::new_async().await;
        let executor = executor_for(&server);

        let outcome = executor
            .execute(None, &json!({"type": "web_search", "query": "latest news"}))
            .await
            .unwrap();

        assert!(outcome.result["result"].is_null());
        assert_eq!(outcome.result["context"], json!({}));
        assert_eq!(outcome.explanation, WEB_SEARCH_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_step_without_kind_is_recorded_by_index() {
        let server = mockito::Server::new_async().await;
        let executor = executor_for(&server);
        let params = json!({
            "steps": [
                {"type": "websearch", "query": "a"},
                {"query": "no kind here"}
            ]
        });

        let outcome = executor.execute(None, &params).await.unwrap();
        let results = outcome.result["workflow_results"].as_array().unwrap();

        assert_eq!(results[1]["step"], "step_1");
        assert!(results[1]["result"].is_null());
        assert_eq!(
            results[1]["explanation"],
            "Failed with error: Unknown or unsupported step type: (missing)"
        );
        assert!(outcome
            .explanation
            .ends_with("Step 'step_1': Failed with error: Unknown or unsupported step type: (missing)\n"));
    }

    #[tokio::test]
    async fn test_multi_sentence_without_string_input_runs_dynamic_workflow() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("POST", "/chat/document-search")
            .match_body(Matcher::PartialJson(json!({"query": "fallback"})))
            .with_status(200)
            .with_body(r#"{"answer": "dynamic"}"#)
            .expect(1)
            .create_async()
            .await;

        let executor = executor_for(&server);
        let outcome = executor
            .execute(
                Some(MULTI_SENTENCE_WORKFLOW),
                &json!({"user_input": 42, "query": "fallback"}),
            )
            .await
            .unwrap();
        assert_eq!(outcome.result["result"]["answer"], "dynamic");
        assert!(outcome.result.get("final_answer").is_none());

        let err = executor
            .execute(Some(MULTI_SENTENCE_WORKFLOW), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UndeterminedOperation));
        search.assert_async().await;
    }

    #[tokio::test]
    async fn test_undetermined_operation() {
        let server = mockito::Server::new_async().await;
        let executor = executor_for(&server);

        let err = executor
            .execute(None, &json!({"foo": "bar"}))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UndeterminedOperation));

        let err = executor.execute(None, &json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidParameters));
    }
}
