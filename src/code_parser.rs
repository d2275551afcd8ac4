// Workflow extraction from generated JavaScript
//
// Generated tool code embeds the workflow as object literals passed to
// `JSON.stringify` or as `executeWorkflow(...)` calls. The patterns below are
// tried in order; the first match wins.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::workflow::MULTI_SENTENCE_WORKFLOW;

pub const MULTI_STEP_WORKFLOW: &str = "multi_step_workflow";

/// Workflow types the dispatcher accepts from parsed code
pub const SUPPORTED_WORKFLOW_TYPES: &[&str] = &[
    "document_search",
    "document_analysis",
    "image_analysis",
    "query",
    "chat_completion",
    MULTI_SENTENCE_WORKFLOW,
    MULTI_STEP_WORKFLOW,
];

// Pattern 1: JSON.stringify({ workflow_type: 't', parameters: JSON.stringify({...}) })
static STRINGIFIED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"JSON\.stringify\(\s*\{\s*workflow_type:\s*['"`]([^'"`]+)['"`]\s*,\s*parameters:\s*JSON\.stringify\(\s*(\{[^}]*(?:\{[^}]*\}[^}]*)*\})\s*\)\s*\}\s*\)"#).unwrap()
});

// Pattern 2: workflow_type: 't', parameters: {...}
static OBJECT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"workflow_type:\s*['"`]([^'"`]+)['"`]\s*,\s*parameters:\s*(\{[^}]*(?:\{[^}]*\}[^}]*)*\})"#).unwrap()
});

// Pattern 3: executeWorkflow('literal input')
static LITERAL_CALL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"executeWorkflow\(\s*['"`]([^'"`]+)['"`]\s*\)"#).unwrap());

// Pattern 4: several stringified steps
static WORKFLOW_TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"workflow_type:\s*['"`]([^'"`]+)['"`]"#).unwrap());

static STEP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"workflow_type:\s*['"`]([^'"`]+)['"`]\s*,\s*parameters:\s*JSON\.stringify\(\s*(\{[^}]*(?:\{[^}]*\}[^}]*)*\})\s*\)"#).unwrap()
});

// Pattern 5: steps: [ ... ]
static STEPS_ARRAY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"steps:\s*\[([^\]]+)\]").unwrap());

// Pattern 6: query: 'text'
static QUERY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"query:\s*['"`]([^'"`]+)['"`]"#).unwrap());

// Patterns 7 and 8: input forwarded from the tool argument
static USER_INPUT_CALL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"executeWorkflow\(\s*userInput\s*\)").unwrap());

static QUERY_CALL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"executeWorkflow\(\s*query\s*\)").unwrap());

// Object literal loosening
static BARE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z0-9_]+):").unwrap());

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

static BARE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\s*([A-Za-z0-9_]+)(\s*[,}])").unwrap());

/// Workflow extracted from generated code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedWorkflow {
    pub workflow_type: String,
    pub parameters: Value,
    pub raw_code: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParsedWorkflow {
    fn valid(workflow_type: &str, parameters: Value, raw_code: &str) -> Self {
        Self {
            workflow_type: workflow_type.to_string(),
            parameters,
            raw_code: raw_code.to_string(),
            is_valid: true,
            error: None,
        }
    }

    fn invalid(workflow_type: &str, parameters: Value, raw_code: &str, error: String) -> Self {
        Self {
            workflow_type: workflow_type.to_string(),
            parameters,
            raw_code: raw_code.to_string(),
            is_valid: false,
            error: Some(error),
        }
    }
}

/// Outcome of checking whether generated code can be executed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<String>,
}

/// Extract `workflow_type` and `parameters` from generated code
pub fn parse_workflow_code(code: &str) -> ParsedWorkflow {
    let raw_code = code.trim();

    if let Some(caps) = STRINGIFIED_PATTERN.captures(raw_code) {
        let workflow_type = &caps[1];
        return match parse_object_literal(&caps[2]) {
            Ok(parameters) => ParsedWorkflow::valid(workflow_type, parameters, raw_code),
            Err(e) => ParsedWorkflow::invalid(
                workflow_type,
                json!({}),
                raw_code,
                format!("Failed to parse parameters JSON: {}", e),
            ),
        };
    }

    if let Some(caps) = OBJECT_PATTERN.captures(raw_code) {
        let workflow_type = &caps[1];
        return match parse_object_literal(&caps[2]) {
            Ok(parameters) => ParsedWorkflow::valid(workflow_type, parameters, raw_code),
            Err(e) => ParsedWorkflow::invalid(
                workflow_type,
                json!({}),
                raw_code,
                format!("Failed to parse parameters object: {}", e),
            ),
        };
    }

    if let Some(caps) = LITERAL_CALL_PATTERN.captures(raw_code) {
        return ParsedWorkflow::valid(
            MULTI_SENTENCE_WORKFLOW,
            json!({ "user_input": &caps[1] }),
            raw_code,
        );
    }

    if WORKFLOW_TYPE_PATTERN.find_iter(raw_code).count() > 1 {
        let steps = collect_stringified_steps(raw_code);
        if steps.len() > 1 {
            return ParsedWorkflow::valid(MULTI_STEP_WORKFLOW, json!({ "steps": steps }), raw_code);
        }
    }

    if let Some(caps) = STEPS_ARRAY_PATTERN.captures(raw_code) {
        let literal = format!("[{}]", &caps[1]);
        return match parse_object_literal(&literal) {
            Ok(steps) => {
                ParsedWorkflow::valid(MULTI_STEP_WORKFLOW, json!({ "steps": steps }), raw_code)
            }
            Err(e) => ParsedWorkflow::invalid(
                MULTI_STEP_WORKFLOW,
                json!({ "steps": [] }),
                raw_code,
                format!("Failed to parse multi-step workflow: {}", e),
            ),
        };
    }

    if let Some(caps) = QUERY_PATTERN.captures(raw_code) {
        return ParsedWorkflow::valid("document_search", json!({ "query": &caps[1] }), raw_code);
    }

    if USER_INPUT_CALL_PATTERN.is_match(raw_code) {
        return ParsedWorkflow::valid(MULTI_SENTENCE_WORKFLOW, json!({ "user_input": "" }), raw_code);
    }

    if QUERY_CALL_PATTERN.is_match(raw_code) {
        return ParsedWorkflow::valid("document_search", json!({ "query": "" }), raw_code);
    }

    ParsedWorkflow::invalid(
        "",
        json!({}),
        raw_code,
        "Could not extract workflow parameters from the generated code".to_string(),
    )
}

/// Parse the code and check that its workflow type is supported
pub fn validate_workflow_code(code: &str) -> ValidationResult {
    let parsed = parse_workflow_code(code);
    validate_parsed(&parsed)
}

pub fn validate_parsed(parsed: &ParsedWorkflow) -> ValidationResult {
    if !parsed.is_valid {
        return ValidationResult {
            is_valid: false,
            error: parsed.error.clone(),
            workflow_type: None,
        };
    }

    if !SUPPORTED_WORKFLOW_TYPES.contains(&parsed.workflow_type.as_str()) {
        return ValidationResult {
            is_valid: false,
            error: Some(format!("Unsupported workflow type: {}", parsed.workflow_type)),
            workflow_type: Some(parsed.workflow_type.clone()),
        };
    }

    ValidationResult {
        is_valid: true,
        error: None,
        workflow_type: Some(parsed.workflow_type.clone()),
    }
}

/// Every `workflow_type: 't', parameters: JSON.stringify({...})` as a step
fn collect_stringified_steps(raw_code: &str) -> Vec<Value> {
    let mut steps = Vec::new();

    for caps in STEP_PATTERN.captures_iter(raw_code) {
        match parse_object_literal(&caps[2]) {
            Ok(Value::Object(params)) => {
                let mut step = Map::new();
                step.insert("type".to_string(), Value::String(caps[1].to_string()));
                step.extend(params);
                steps.push(Value::Object(step));
            }
            Ok(other) => {
                tracing::warn!(value = %other, "Step parameters are not an object, skipping");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse step parameters, skipping");
            }
        }
    }

    steps
}

/// Turn a JavaScript object literal into JSON and parse it
fn parse_object_literal(literal: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&loosen_object_literal(literal))
}

/// Quote keys, normalise quotes, drop trailing commas and blank out
/// variable references
pub fn loosen_object_literal(literal: &str) -> String {
    let quoted = BARE_KEY.replace_all(literal, "\"${1}\":");
    let quoted = quoted.replace('\'', "\"");
    let trimmed = TRAILING_COMMA.replace_all(&quoted, "${1}");

    BARE_VALUE
        .replace_all(&trimmed, |caps: &Captures| {
            let value = &caps[1];
            if is_json_literal(value) {
                caps[0].to_string()
            } else {
                format!(": \"\"{}", &caps[2])
            }
        })
        .into_owned()
}

fn is_json_literal(token: &str) -> bool {
    matches!(token, "true" | "false" | "null") || token.parse::<f64>().is_ok()
}
