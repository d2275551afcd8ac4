// Step kind resolution

use serde_json::{Map, Value};
use std::fmt;

/// The operation a workflow step asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    DocumentSearch,
    DocumentAnalysis,
    ImageAnalysis,
    Query,
    ChatCompletion,
    /// Recognised but not offered by the upstream API
    WebSearch,
    Unknown(String),
}

impl StepKind {
    /// Map a `type`/`operation` string, including its aliases, to a kind
    pub fn parse(kind: &str) -> Self {
        match kind {
            "document_search" | "docsearch" => StepKind::DocumentSearch,
            "document_analysis" | "docanalysis" => StepKind::DocumentAnalysis,
            "image_analysis" | "imageanalysis" => StepKind::ImageAnalysis,
            "query" | "search" => StepKind::Query,
            "chat" | "chat_completion" | "completion" => StepKind::ChatCompletion,
            "websearch" | "web_search" => StepKind::WebSearch,
            other => StepKind::Unknown(other.to_string()),
        }
    }

    /// Kind of a step object, read from `type` then `operation`
    pub fn of(step: &Map<String, Value>) -> Self {
        match declared_kind(step) {
            Some(kind) => StepKind::parse(kind),
            None => StepKind::Unknown(String::new()),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::DocumentSearch => "document_search",
            StepKind::DocumentAnalysis => "document_analysis",
            StepKind::ImageAnalysis => "image_analysis",
            StepKind::Query => "query",
            StepKind::ChatCompletion => "chat_completion",
            StepKind::WebSearch => "web_search",
            StepKind::Unknown(kind) if kind.is_empty() => "(missing)",
            StepKind::Unknown(kind) => kind,
        };
        f.write_str(name)
    }
}

fn declared_kind(step: &Map<String, Value>) -> Option<&str> {
    ["type", "operation"]
        .iter()
        .find_map(|key| step.get(*key).and_then(|v| v.as_str()).filter(|s| !s.is_empty()))
}

/// Name under which a step's result is recorded and stored in the context
pub fn step_name(step: &Map<String, Value>, index: usize) -> String {
    step.get("name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .or_else(|| declared_kind(step))
        .map(str::to_string)
        .unwrap_or_else(|| format!("step_{}", index))
}
