//! Workflow template catalogue
//!
//! Each template is a workflow skeleton whose string values carry `{name}`
//! placeholders. A description is matched to a template by keyword scoring,
//! parameters are pulled out of it with regexes, and the skeleton is filled
//! in with [`customize_template`].

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{json, Map, Value};

static PARAM_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").unwrap());

static QUERY_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:for|about|regarding)\s+([^.,]+)").unwrap());

static SEARCH_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:search|find|look for)\s+([^.,]+)").unwrap());

static ANALYSIS_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:analyze|examine|review)\s+([^.,]+)").unwrap());

/// Result of checking extracted parameters against a template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl TemplateValidation {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// A predefined workflow skeleton
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub pattern: &'static str,
    pub template: Value,
    pub required_params: Vec<&'static str>,
    pub optional_params: Vec<&'static str>,
    pub examples: Vec<&'static str>,
    #[serde(skip)]
    rule: ValidationRule,
}

/// Parameter checks a template applies before it is filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValidationRule {
    DocumentSearch,
    DocumentAnalysis,
    MultiStepResearch,
    ChatCompletion,
}

impl WorkflowTemplate {
    pub fn validate(&self, params: &Map<String, Value>) -> TemplateValidation {
        let errors = match self.rule {
            ValidationRule::DocumentSearch => validate_document_search(params),
            ValidationRule::DocumentAnalysis => validate_document_analysis(params),
            ValidationRule::MultiStepResearch => validate_multi_step_research(params),
            ValidationRule::ChatCompletion => validate_chat_completion(params),
        };
        TemplateValidation::from_errors(errors)
    }

    fn pattern_words(&self) -> Vec<String> {
        self.pattern.to_lowercase().split(' ').map(str::to_string).collect()
    }
}

/// JavaScript truthiness of an optional JSON value
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(_) => true,
    }
}

fn validate_document_search(params: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();
    match params.get("query") {
        Some(Value::String(q)) if !q.is_empty() => {}
        _ => errors.push("Query parameter is required and must be a string".to_string()),
    }
    errors
}

fn validate_document_analysis(params: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();
    if !is_truthy(params.get("query")) {
        errors.push("Query parameter is required".to_string());
    }
    if !matches!(params.get("document_ids"), Some(Value::Array(_))) {
        errors.push("Document IDs array is required".to_string());
    }
    errors
}

fn validate_multi_step_research(params: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();
    if !is_truthy(params.get("search_query")) {
        errors.push("Search query is required".to_string());
    }
    if !is_truthy(params.get("analysis_query")) {
        errors.push("Analysis query is required".to_string());
    }
    errors
}

fn validate_chat_completion(params: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();
    if !is_truthy(params.get("user_message")) {
        errors.push("User message is required".to_string());
    }
    errors
}

/// The template catalogue, in match priority order
pub static WORKFLOW_TEMPLATES: Lazy<Vec<WorkflowTemplate>> = Lazy::new(|| {
    vec![
        WorkflowTemplate {
            id: "document_search",
            name: "Document Search",
            description: "Search through documents with a query",
            pattern: "search documents for {query}",
            template: json!({
                "workflow_type": "document_search",
                "parameters": {
                    "query": "{query}",
                    "model": "alfred-4.2",
                    "tool": "DocumentSearch"
                }
            }),
            required_params: vec!["query"],
            optional_params: vec!["model", "workspace_ids", "file_ids"],
            examples: vec![
                "Search documents for customer complaints",
                "Find information about AI workflows in our documents",
                "Look for sales data in the uploaded files",
            ],
            rule: ValidationRule::DocumentSearch,
        },
        WorkflowTemplate {
            id: "document_analysis",
            name: "Document Analysis",
            description: "Analyze specific documents with a query",
            pattern: "analyze {documents} for {query}",
            template: json!({
                "workflow_type": "document_analysis",
                "parameters": {
                    "query": "{query}",
                    "document_ids": "{document_ids}",
                    "model": "alfred-4.2"
                }
            }),
            required_params: vec!["query", "document_ids"],
            optional_params: vec!["model"],
            examples: vec![
                "Analyze the quarterly report for financial trends",
                "Review the contract documents for key terms",
                "Examine the research papers for methodology",
            ],
            rule: ValidationRule::DocumentAnalysis,
        },
        WorkflowTemplate {
            id: "multi_step_research",
            name: "Multi-Step Research",
            description: "Search documents and then analyze the results",
            pattern: "research {topic} by searching documents and analyzing findings",
            template: json!({
                "workflow_type": "multi_step_workflow",
                "parameters": {
                    "steps": [
                        {
                            "type": "document_search",
                            "query": "{search_query}",
                            "model": "alfred-4.2"
                        },
                        {
                            "type": "document_analysis",
                            "query": "{analysis_query}",
                            "document_ids": "{found_document_ids}",
                            "model": "alfred-4.2"
                        }
                    ]
                }
            }),
            required_params: vec!["search_query", "analysis_query"],
            optional_params: vec!["model"],
            examples: vec![
                "Research AI automation by searching documents and analyzing the findings",
                "Find information about customer feedback and then analyze the patterns",
                "Search for technical documentation and analyze the implementation details",
            ],
            rule: ValidationRule::MultiStepResearch,
        },
        WorkflowTemplate {
            id: "chat_completion",
            name: "Chat Completion",
            description: "Generate a response using chat completion",
            pattern: "generate a response about {topic}",
            template: json!({
                "workflow_type": "chat_completion",
                "parameters": {
                    "messages": [
                        {
                            "role": "user",
                            "content": "{user_message}"
                        }
                    ],
                    "model": "alfred-4.2",
                    "temperature": 0.7
                }
            }),
            required_params: vec!["user_message"],
            optional_params: vec!["model", "temperature"],
            examples: vec![
                "Generate a response about AI workflow automation",
                "Create a summary of the key points",
                "Explain the benefits of process automation",
            ],
            rule: ValidationRule::ChatCompletion,
        },
    ]
});

/// Words of `example` that occur anywhere in the lowercased description
fn shared_words(example: &str, description: &str) -> usize {
    example
        .to_lowercase()
        .split(' ')
        .filter(|word| description.contains(word))
        .count()
}

fn pattern_score(template: &WorkflowTemplate, description: &str) -> u32 {
    template
        .pattern_words()
        .iter()
        .filter(|word| description.contains(word.as_str()))
        .count() as u32
}

/// Score every template; stable sort keeps catalogue order among ties
fn ranked<F>(description: &str, score: F) -> Vec<(&'static WorkflowTemplate, u32)>
where
    F: Fn(&WorkflowTemplate, &str) -> u32,
{
    let description = description.to_lowercase();
    let mut scored: Vec<_> = WORKFLOW_TEMPLATES
        .iter()
        .map(|template| (template, score(template, &description)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
}

/// Highest scoring template, or `None` when nothing matches at all
pub fn find_best_template(description: &str) -> Option<&'static WorkflowTemplate> {
    ranked(description, |template, description| {
        let examples = template
            .examples
            .iter()
            .filter(|example| shared_words(example, description) > 2)
            .count() as u32;
        pattern_score(template, description) + 2 * examples
    })
    .into_iter()
    .next()
    .filter(|(_, score)| *score > 0)
    .map(|(template, _)| template)
}

/// Up to three templates that match the description, best first
pub fn template_suggestions(description: &str) -> Vec<&'static WorkflowTemplate> {
    ranked(description, |template, description| {
        let examples = template
            .examples
            .iter()
            .filter(|example| shared_words(example, description) > 1)
            .count() as u32;
        pattern_score(template, description) + examples
    })
    .into_iter()
    .filter(|(_, score)| *score > 0)
    .take(3)
    .map(|(template, _)| template)
    .collect()
}

/// Human readable reason for choosing `template`
pub fn explain_template_choice(template: &WorkflowTemplate, description: &str) -> String {
    let description = description.to_lowercase();
    let mut reasons = Vec::new();

    let matched: Vec<String> = template
        .pattern_words()
        .into_iter()
        .filter(|word| description.contains(word.as_str()))
        .collect();
    if !matched.is_empty() {
        reasons.push(format!("Matched keywords: {}", matched.join(", ")));
    }

    let similar: Vec<&str> = template
        .examples
        .iter()
        .copied()
        .filter(|example| shared_words(example, &description) > 1)
        .take(2)
        .collect();
    if !similar.is_empty() {
        reasons.push(format!("Similar to examples: {}", similar.join(", ")));
    }

    format!(
        "Chose \"{}\" template because: {}",
        template.name,
        reasons.join("; ")
    )
}

/// Pull the template's required parameters out of a free-text description
pub fn extract_parameters(template: &WorkflowTemplate, description: &str) -> Map<String, Value> {
    let mut params = Map::new();
    let phrases: [(&str, &Lazy<Regex>); 3] = [
        ("query", &QUERY_PHRASE),
        ("search_query", &SEARCH_PHRASE),
        ("analysis_query", &ANALYSIS_PHRASE),
    ];

    for (name, pattern) in phrases {
        if !template.required_params.contains(&name) {
            continue;
        }
        if let Some(caps) = pattern.captures(description) {
            params.insert(name.to_string(), Value::String(caps[1].trim().to_string()));
        }
    }

    if template.required_params.contains(&"user_message") {
        params.insert(
            "user_message".to_string(),
            Value::String(description.to_string()),
        );
    }

    params
}

/// Copy the template skeleton with `{name}` placeholders filled in
///
/// A string that is exactly one placeholder takes the parameter's JSON value.
/// Missing or empty parameters leave the placeholder in place.
pub fn customize_template(template: &WorkflowTemplate, params: &Map<String, Value>) -> Value {
    fill_placeholders(&template.template, params)
}

fn fill_placeholders(value: &Value, params: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => fill_string(s, params),
        Value::Array(items) => Value::Array(items.iter().map(|v| fill_placeholders(v, params)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), fill_placeholders(v, params)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn fill_string(template: &str, params: &Map<String, Value>) -> Value {
    let param = |name: &str| params.get(name).filter(|v| is_truthy(Some(*v)));

    if let Some(caps) = PARAM_PLACEHOLDER.captures(template) {
        if caps[0].len() == template.len() {
            if let Some(value) = param(&caps[1]) {
                return value.clone();
            }
        }
    }

    let filled = PARAM_PLACEHOLDER.replace_all(template, |caps: &Captures| match param(&caps[1]) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => caps[0].to_string(),
    });

    Value::String(filled.into_owned())
}
