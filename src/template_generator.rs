// Template-first workflow generation with LLM parameter repair

use serde::Serialize;
use serde_json::{Map, Value};

use crate::prompts;
use crate::providers::OpenAiClient;
use crate::templates::{customize_template, extract_parameters, find_best_template, WorkflowTemplate};

const ENHANCEMENT_MODEL: &str = "gpt-4";
const ENHANCEMENT_TEMPERATURE: f64 = 0.3;
const ENHANCEMENT_MAX_TOKENS: u32 = 500;

/// Outcome of generating a workflow from the template catalogue
#[derive(Debug, Clone, Serialize)]
pub struct TemplateGenerationResult {
    pub success: bool,
    pub workflow: Option<Value>,
    pub template: Option<&'static WorkflowTemplate>,
    pub confidence: f64,
    pub errors: Vec<String>,
    pub fallback_to_ai: bool,
}

impl TemplateGenerationResult {
    fn generated(template: &'static WorkflowTemplate, workflow: Value, confidence: f64) -> Self {
        Self {
            success: true,
            workflow: Some(workflow),
            template: Some(template),
            confidence,
            errors: Vec::new(),
            fallback_to_ai: false,
        }
    }

    fn failed(template: Option<&'static WorkflowTemplate>, confidence: f64, errors: Vec<String>) -> Self {
        Self {
            success: false,
            workflow: None,
            template,
            confidence,
            errors,
            fallback_to_ai: true,
        }
    }
}

/// Build a workflow for `description` from the best matching template
///
/// Parameters that fail validation are sent to the LLM for repair when a
/// client is available.
pub async fn generate_workflow_with_templates(
    description: &str,
    openai: Option<&OpenAiClient>,
) -> TemplateGenerationResult {
    let Some(template) = find_best_template(description) else {
        tracing::info!("No template matched the description");
        return TemplateGenerationResult::failed(
            None,
            0.0,
            vec!["No matching template found".to_string()],
        );
    };

    tracing::info!(template = template.id, "Matched workflow template");

    let extracted = extract_parameters(template, description);
    let validation = template.validate(&extracted);

    if validation.valid {
        let workflow = customize_template(template, &extracted);
        return TemplateGenerationResult::generated(template, workflow, 0.9);
    }

    tracing::debug!(errors = ?validation.errors, "Extracted parameters incomplete, asking the LLM");

    let Some(openai) = openai else {
        tracing::warn!("OpenAI client not configured, cannot enhance template parameters");
        return enhancement_failed(template);
    };

    let enhanced = match enhance_parameters(openai, template, description, &extracted, &validation.errors).await {
        Ok(enhanced) => enhanced,
        Err(e) => {
            tracing::warn!(error = %e, template = template.id, "Template enhancement failed");
            return enhancement_failed(template);
        }
    };

    let mut merged = extracted;
    merged.extend(enhanced);

    let validation = template.validate(&merged);
    if validation.valid {
        let workflow = customize_template(template, &merged);
        TemplateGenerationResult::generated(template, workflow, 0.7)
    } else {
        TemplateGenerationResult::failed(Some(template), 0.3, validation.errors)
    }
}

fn enhancement_failed(template: &'static WorkflowTemplate) -> TemplateGenerationResult {
    TemplateGenerationResult::failed(
        Some(template),
        0.0,
        vec!["Failed to enhance template with AI".to_string()],
    )
}

/// Ask the LLM for a corrected parameter object
async fn enhance_parameters(
    openai: &OpenAiClient,
    template: &WorkflowTemplate,
    description: &str,
    extracted: &Map<String, Value>,
    errors: &[String],
) -> anyhow::Result<Map<String, Value>> {
    let extracted_json = serde_json::to_string_pretty(extracted)?;
    let prompt = prompts::parameter_enhancement(
        template.name,
        template.description,
        &template.required_params,
        &template.optional_params,
        description,
        &extracted_json,
        errors,
    );

    let response = openai
        .complete(
            ENHANCEMENT_MODEL,
            prompts::PARAMETER_SYSTEM_PROMPT,
            &prompt,
            Some(ENHANCEMENT_TEMPERATURE),
            ENHANCEMENT_MAX_TOKENS,
        )
        .await?;

    let content = response.first_content().unwrap_or("{}");
    match serde_json::from_str::<Value>(content)? {
        Value::Object(params) => Ok(params),
        other => anyhow::bail!("expected a JSON object of parameters, got {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::UpstreamHttpClient;
    use serde_json::json;
    use std::sync::Arc;

    fn openai_for(server: &mockito::ServerGuard) -> OpenAiClient {
        let http = Arc::new(UpstreamHttpClient::new(4, 5, 5).unwrap());
        OpenAiClient::new(http, server.url(), "sk-test")
    }

    fn completion(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    #[tokio::test]
    async fn test_direct_template_match() {
        let result =
            generate_workflow_with_templates("Search documents for customer complaints", None).await;
        assert!(result.success);
        assert_eq!(result.confidence, 0.9);
        assert!(!result.fallback_to_ai);
        assert_eq!(result.template.unwrap().id, "document_search");
        assert_eq!(
            result.workflow.unwrap()["parameters"]["query"],
            "customer complaints"
        );
    }

    #[tokio::test]
    async fn test_no_template() {
        let result = generate_workflow_with_templates("zzz", None).await;
        assert!(!result.success);
        assert!(result.fallback_to_ai);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.errors, vec!["No matching template found"]);
        assert!(result.template.is_none());
    }

    #[tokio::test]
    async fn test_enhancement_fills_missing_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "gpt-4",
                "max_tokens": 500
            })))
            .with_status(200)
            .with_body(completion(r#"{"document_ids": ["doc-1"]}"#))
            .create_async()
            .await;

        let openai = openai_for(&server);
        let result = generate_workflow_with_templates(
            "Analyze the quarterly report for financial trends",
            Some(&openai),
        )
        .await;

        assert!(result.success);
        assert_eq!(result.confidence, 0.7);
        let workflow = result.workflow.unwrap();
        assert_eq!(workflow["workflow_type"], "document_analysis");
        assert_eq!(workflow["parameters"]["query"], "financial trends");
        assert_eq!(workflow["parameters"]["document_ids"], json!(["doc-1"]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_enhancement_still_invalid() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(completion(r#"{"model": "alfred-4.2"}"#))
            .create_async()
            .await;

        let openai = openai_for(&server);
        let result = generate_workflow_with_templates(
            "Analyze the quarterly report for financial trends",
            Some(&openai),
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.errors, vec!["Document IDs array is required"]);
        assert!(result.fallback_to_ai);
    }

    #[tokio::test]
    async fn test_enhancement_upstream_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .create_async()
            .await;

        let openai = openai_for(&server);
        let result = generate_workflow_with_templates(
            "Analyze the quarterly report for financial trends",
            Some(&openai),
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.errors, vec!["Failed to enhance template with AI"]);
        assert_eq!(result.template.unwrap().id, "document_analysis");
    }

    #[tokio::test]
    async fn test_enhancement_without_client() {
        let result =
            generate_workflow_with_templates("Analyze the quarterly report for financial trends", None)
                .await;
        assert_eq!(result.errors, vec!["Failed to enhance template with AI"]);
    }
}
