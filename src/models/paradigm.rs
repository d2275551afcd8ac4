use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Model used when a step does not name one
pub const DEFAULT_MODEL: &str = "alfred-4.2";

/// Tool used by document search when a step does not name one
pub const DEFAULT_SEARCH_TOOL: &str = "DocumentSearch";

// ==================================================================================================
// Field helpers
// ==================================================================================================

/// Copy a field out of a step, treating JSON null as absent
fn field(step: &Map<String, Value>, key: &str) -> Option<Value> {
    step.get(key).filter(|v| !v.is_null()).cloned()
}

/// A non-empty string field, or the given default
fn string_or(step: &Map<String, Value>, key: &str, default: &str) -> String {
    step.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

// ==================================================================================================
// POST /chat/document-search
// ==================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_ids: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_session_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_scope: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_scope: Option<Value>,
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_instructions: Option<String>,
}

impl DocumentSearchRequest {
    /// Narrow a step (or bare parameter object) to the fields search accepts
    pub fn from_step(step: &Map<String, Value>) -> Self {
        Self {
            query: field(step, "query"),
            model: string_or(step, "model", DEFAULT_MODEL),
            workspace_ids: field(step, "workspace_ids"),
            file_ids: field(step, "file_ids"),
            chat_session_id: field(step, "chat_session_id"),
            company_scope: field(step, "company_scope"),
            private_scope: field(step, "private_scope"),
            tool: string_or(step, "tool", DEFAULT_SEARCH_TOOL),
            private: field(step, "private"),
            user_instructions: None,
        }
    }

    /// Search for a single question, asking for a direct answer
    pub fn for_question(question: &str) -> Self {
        Self {
            query: Some(Value::String(question.to_string())),
            model: DEFAULT_MODEL.to_string(),
            workspace_ids: None,
            file_ids: None,
            chat_session_id: None,
            company_scope: None,
            private_scope: None,
            tool: DEFAULT_SEARCH_TOOL.to_string(),
            private: None,
            user_instructions: Some(format!(
                "Please answer the following question specifically and directly: {}. \
                 Do not provide general information unless it directly relates to the question asked.",
                question
            )),
        }
    }
}

// ==================================================================================================
// POST /chat/document-analysis and /chat/image-analysis
// ==================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Value>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<Value>,
}

impl AnalysisRequest {
    pub fn from_step(step: &Map<String, Value>) -> Self {
        Self {
            query: field(step, "query"),
            document_ids: field(step, "document_ids"),
            model: string_or(step, "model", DEFAULT_MODEL),
            private: field(step, "private"),
        }
    }
}

// ==================================================================================================
// POST /query
// ==================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<Value>,
}

impl QueryRequest {
    pub fn from_step(step: &Map<String, Value>) -> Self {
        Self {
            query: field(step, "query"),
            collection: field(step, "collection"),
            n: field(step, "n"),
        }
    }
}

// ==================================================================================================
// POST /chat/completions
// ==================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Value>,
}

impl ChatCompletionRequest {
    pub fn from_step(step: &Map<String, Value>) -> Self {
        Self {
            model: string_or(step, "model", DEFAULT_MODEL),
            messages: field(step, "messages"),
            temperature: field(step, "temperature"),
            max_tokens: field(step, "max_tokens"),
        }
    }
}

// ==================================================================================================
// Document analysis job status
// ==================================================================================================

/// State of an asynchronous document analysis job
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisStatus {
    Completed,
    Failed(String),
    Pending,
}

impl AnalysisStatus {
    /// Classify a job body by its `status` field
    ///
    /// A body without a status is the finished result.
    pub fn of(body: &Value) -> Self {
        let Some(status) = body.get("status").and_then(|s| s.as_str()) else {
            return AnalysisStatus::Completed;
        };

        match status.to_lowercase().as_str() {
            "completed" | "complete" | "done" | "success" | "succeeded" => {
                AnalysisStatus::Completed
            }
            "failed" | "error" => {
                let detail = body
                    .get("error")
                    .or_else(|| body.get("detail"))
                    .or_else(|| body.get("message"))
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| format!("job reported status '{}'", status));
                AnalysisStatus::Failed(detail)
            }
            _ => AnalysisStatus::Pending,
        }
    }
}

/// Job identifier returned by the analysis endpoint, if the job is asynchronous
pub fn analysis_job_id(body: &Value) -> Option<String> {
    ["chat_response_id", "id"].iter().find_map(|key| match body.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
