// Prompt text sent to the LLM providers

pub const GENERATION_SYSTEM_PROMPT: &str = "You are an expert in workflow automation and API integration. Generate both executable code and tool configurations in valid JSON format.";

pub const DESCRIPTION_SYSTEM_PROMPT: &str = "You are an expert at explaining technical workflows in simple terms. Return ONLY the workflow description without any markdown formatting or explanatory text.";

pub const PARAMETER_SYSTEM_PROMPT: &str = "You are an expert at extracting workflow parameters from natural language descriptions. Return ONLY valid JSON without any markdown formatting.";

/// Ask for executable code plus a Paradigm tool config for `description`
///
/// `execute_url` is the public address of this gateway's execute-workflow route.
pub fn workflow_generation(description: &str, execute_url: &str) -> String {
    format!(
        r#"You are an expert in workflow automation and Paradigm's third-party tool integration. Given the following workflow description, generate TWO things:

1. EXECUTABLE CODE: JavaScript/TypeScript code that will execute the workflow by calling the execute-workflow API endpoint
2. PARADIGM TOOL CONFIG: A JSON configuration for Paradigm's third-party tool interface

Workflow Description: "{description}"

Available Paradigm API endpoints (from https://paradigm.lighton.ai/api/schema/swagger-ui/#/):
- Document Search: POST /docsearch
- Web Search: POST /websearch
- Chat Completions: POST /chat/completions
- And other endpoints available in the Swagger documentation

Your response should be a JSON object with two fields:
1. "executable_code": JavaScript/TypeScript code that calls the execute-workflow API
2. "tool_config": JSON configuration for Paradigm third-party tool

The executable code should:
- Parse the workflow description into appropriate API calls
- Handle the workflow execution logic
- Return structured results

The tool config should include:
- name: Descriptive name for the tool
- description: Detailed description for tool routing
- http_method: POST
- url: {execute_url}
- headers: Authorization header for API key
- body_params: Parameters needed for the workflow

Generate both the executable code and the Paradigm tool configuration in valid JSON format."#
    )
}

/// Ask for a plain-language, step-by-step description of generated code
pub fn workflow_description(executable_code: &str) -> String {
    format!(
        r#"You are an expert in workflow automation and the Paradigm AI platform. I have generated executable code for a workflow, and I need you to translate it into a clear, step-by-step description that explicitly mentions the Paradigm tools being used.

Here is the executable code:
```javascript
{executable_code}
```

Please analyze this code and create a clear, concise workflow description that:

1. **Explains each step in plain English**
2. **Explicitly mentions Paradigm tools** (DocSearch, Document Analysis, Image Analysis, Chat Completion, etc.)
3. **Describes the flow of data** between steps
4. **Mentions any specific parameters or configurations**
5. **Explains the expected output**

Focus on making it easy for a non-technical person to understand what the workflow does.

Available Paradigm tools to reference:
- **DocSearch** (Document Search): Searches through documents with a query
- **Document Analysis**: Analyzes specific documents with a query
- **Image Analysis**: Analyzes images in documents
- **Chat Completion**: Generates responses using the AI model
- **Query**: Retrieves document chunks based on a query
- **Multi-Sentence Workflow**: Splits input into sentences and processes each separately
- **Multi-Step Workflow**: Executes multiple steps in sequence

Return ONLY the workflow description in clear, numbered steps. Do not include any markdown formatting, code blocks, or explanatory text."#
    )
}

/// Ask the LLM to fill in template parameters the regex extraction missed
pub fn parameter_enhancement(
    template_name: &str,
    template_description: &str,
    required: &[&str],
    optional: &[&str],
    description: &str,
    extracted: &str,
    errors: &[String],
) -> String {
    format!(
        r#"I have a workflow template that needs parameter enhancement. Here are the details:

Template: {template_name}
Description: {template_description}
Required Parameters: {required}
Optional Parameters: {optional}

User Description: "{description}"

Extracted Parameters: {extracted}

Validation Errors: {errors}

Please help me extract or infer the missing parameters from the user description. Return ONLY a JSON object with the corrected parameters. If you cannot determine a parameter, use a reasonable default or placeholder.

Example response format:
{{
  "query": "extracted or inferred query",
  "document_ids": ["default_document_id"],
  "model": "alfred-4.2"
}}"#,
        required = required.join(", "),
        optional = optional.join(", "),
        errors = errors.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_prompt_embeds_url_and_description() {
        let prompt = workflow_generation("Summarise contracts", "https://gw.example.com/api/execute-workflow");
        assert!(prompt.contains("Workflow Description: \"Summarise contracts\""));
        assert!(prompt.contains("- url: https://gw.example.com/api/execute-workflow"));
    }

    #[test]
    fn test_enhancement_prompt_lists_parameters() {
        let prompt = parameter_enhancement(
            "Document Analysis",
            "Analyze specific documents with a query",
            &["query", "document_ids"],
            &["model"],
            "analyze the report",
            "{}",
            &["Document IDs array is required".to_string()],
        );
        assert!(prompt.contains("Required Parameters: query, document_ids"));
        assert!(prompt.contains("Validation Errors: Document IDs array is required"));
        assert!(prompt.ends_with("\"model\": \"alfred-4.2\"\n}"));
    }
}
