use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==================================================================================================
// Request bodies
// ==================================================================================================

/// Body of POST /api/execute-workflow
///
/// `parameters` is either an object or a string holding JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteWorkflowRequest {
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(default)]
    pub parameters: Value,
}

/// Body of POST /api/generate-workflow and /api/generate-from-template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionRequest {
    #[serde(default)]
    pub description: Value,
}

/// Body of POST /api/generate-workflow-description and /api/execute-code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutableCodeRequest {
    #[serde(rename = "executableCode", default)]
    pub executable_code: Value,
}

/// Body of POST /api/parse-workflow-code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseCodeRequest {
    #[serde(default)]
    pub code: Value,
}

// ==================================================================================================
// Responses
// ==================================================================================================

/// Outcome of one step in a multi-step workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    pub step: String,
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub timestamp: String,
}

impl StepRecord {
    pub fn completed(step: impl Into<String>, result: Value) -> Self {
        Self {
            step: step.into(),
            result,
            explanation: None,
            timestamp: timestamp(),
        }
    }

    pub fn skipped(step: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            result: Value::Null,
            explanation: Some(explanation.into()),
            timestamp: timestamp(),
        }
    }
}

/// Response envelope for a successful workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEnvelope {
    pub success: bool,
    pub result: Value,
    pub workflow_type: Option<String>,
    pub explanation: String,
    pub executed_at: String,
}

impl ExecutionEnvelope {
    pub fn new(workflow_type: Option<String>, result: Value, explanation: String) -> Self {
        Self {
            success: true,
            result,
            workflow_type,
            explanation,
            executed_at: timestamp(),
        }
    }
}

/// Current time as an RFC 3339 string with millisecond precision
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execute_request_accepts_string_parameters() {
        let request: ExecuteWorkflowRequest = serde_json::from_value(json!({
            "workflow_type": "document_search",
            "parameters": "{\"query\": \"q\"}"
        }))
        .unwrap();
        assert!(request.parameters.is_string());
    }

    #[test]
    fn test_execute_request_defaults() {
        let request: ExecuteWorkflowRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.workflow_type.is_none());
        assert!(request.parameters.is_null());
    }

    #[test]
    fn test_executable_code_field_name() {
        let request: ExecutableCodeRequest =
            serde_json::from_value(json!({"executableCode": "run()"})).unwrap();
        assert_eq!(request.executable_code, json!("run()"));
    }

    #[test]
    fn test_step_record_serialization() {
        let record = StepRecord::completed("search", json!({"answer": 1}));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["step"], "search");
        assert!(value.get("explanation").is_none());

        let record = StepRecord::skipped("web", "Failed with error: nope");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["result"].is_null());
        assert_eq!(value["explanation"], "Failed with error: nope");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_envelope() {
        let envelope = ExecutionEnvelope::new(Some("query".to_string()), json!({}), String::new());
        assert!(envelope.success);
        assert_eq!(envelope.workflow_type.as_deref(), Some("query"));
    }
}
