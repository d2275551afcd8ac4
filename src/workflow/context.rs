//! Workflow execution context and placeholder substitution
//!
//! Step results are stored under the step name. Later steps reference them
//! with `{{path}}` placeholders:
//! - `{{search}}` - the whole result of the step named `search`
//! - `{{search.documents.0.id}}` - a nested field; numeric segments index arrays
//!
//! A string that is exactly one placeholder is replaced by the referenced
//! JSON value itself. Embedded placeholders are replaced by text. Placeholders
//! that do not resolve are left untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*)\s*\}\}").unwrap()
});

/// Mutable per-request map of named values
#[derive(Debug, Clone, Default)]
pub struct WorkflowContext {
    values: Map<String, Value>,
}

impl WorkflowContext {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Seed the context from a parameter object's `context` field
    pub fn from_parameters(parameters: &Map<String, Value>) -> Self {
        match parameters.get("context") {
            Some(Value::Object(values)) => Self::new(values.clone()),
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Look up a dotted path
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.values.get(segments.next()?)?;

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// Substitute placeholders in every string inside `value`
    pub fn resolve(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => self.resolve_string(s),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.resolve(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn resolve_string(&self, template: &str) -> Value {
        if !PLACEHOLDER_PATTERN.is_match(template) {
            return Value::String(template.to_string());
        }

        // A lone placeholder keeps the referenced value's JSON type
        if let Some(caps) = PLACEHOLDER_PATTERN.captures(template) {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            if whole.len() == template.trim().len() {
                if let Some(value) = self.lookup(&caps[1]) {
                    return value.clone();
                }
            }
        }

        let replaced = PLACEHOLDER_PATTERN.replace_all(template, |caps: &Captures| {
            match self.lookup(&caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => caps[0].to_string(),
            }
        });

        Value::String(replaced.into_owned())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> WorkflowContext {
        let mut ctx = WorkflowContext::default();
        ctx.insert(
            "search",
            json!({
                "answer": "42 invoices",
                "documents": [{"id": 7}, {"id": 9}],
                "count": 2
            }),
        );
        ctx.insert("topic", json!("billing"));
        ctx
    }

    #[test]
    fn test_from_parameters() {
        let params = json!({"context": {"user": "ana"}, "steps": []});
        let ctx = WorkflowContext::from_parameters(params.as_object().unwrap());
        assert_eq!(ctx.lookup("user"), Some(&json!("ana")));

        let params = json!({"context": "not an object"});
        let ctx = WorkflowContext::from_parameters(params.as_object().unwrap());
        assert_eq!(ctx.into_value(), json!({}));
    }

    #[test]
    fn test_lookup_paths() {
        let ctx = context();
        assert_eq!(ctx.lookup("topic"), Some(&json!("billing")));
        assert_eq!(ctx.lookup("search.documents.1.id"), Some(&json!(9)));
        assert_eq!(ctx.lookup("search.documents.5.id"), None);
        assert_eq!(ctx.lookup("search.answer.deeper"), None);
        assert_eq!(ctx.lookup("missing"), None);
    }

    #[test]
    fn test_embedded_placeholders_become_text() {
        let ctx = context();
        let resolved = ctx.resolve(&json!("Summarise {{search.answer}} about {{topic}}"));
        assert_eq!(resolved, json!("Summarise 42 invoices about billing"));

        let resolved = ctx.resolve(&json!("count={{ search.count }}"));
        assert_eq!(resolved, json!("count=2"));
    }

    #[test]
    fn test_lone_placeholder_keeps_json_type() {
        let ctx = context();
        assert_eq!(
            ctx.resolve(&json!("{{search.documents}}")),
            json!([{"id": 7}, {"id": 9}])
        );
        assert_eq!(ctx.resolve(&json!("{{search.count}}")), json!(2));
    }

    #[test]
    fn test_unresolved_placeholder_is_kept() {
        let ctx = context();
        assert_eq!(
            ctx.resolve(&json!("use {{nothing.here}}")),
            json!("use {{nothing.here}}")
        );
        assert_eq!(ctx.resolve(&json!("{{nothing}}")), json!("{{nothing}}"));
    }

    #[test]
    fn test_resolve_recurses_through_structures() {
        let ctx = context();
        let step = json!({
            "type": "chat",
            "messages": [{"role": "user", "content": "About {{topic}}"}],
            "temperature": 0.5,
            "document_ids": "{{search.documents}}"
        });
        let resolved = ctx.resolve(&step);
        assert_eq!(resolved["messages"][0]["content"], "About billing");
        assert_eq!(resolved["temperature"], 0.5);
        assert_eq!(resolved["document_ids"][0]["id"], 7);
    }

    #[test]
    fn test_single_brace_tokens_are_not_placeholders() {
        let ctx = context();
        assert_eq!(ctx.resolve(&json!("{topic}")), json!("{topic}"));
    }
}
