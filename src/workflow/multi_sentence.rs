//! One document search per sentence of free-form user input
//!
//! The answers are collected into `workflow_results` and rendered as a
//! question/answer transcript in `final_answer`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use super::executor::ExecutionOutcome;
use crate::models::paradigm::DocumentSearchRequest;
use crate::models::workflow::timestamp;
use crate::providers::ParadigmClient;

static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

const NO_ANSWER: &str = "No answer found";

#[derive(Debug, Clone)]
struct SentenceAnswer {
    sentence: String,
    answer: String,
    succeeded: bool,
}

/// Search every sentence of `user_input` in order
pub async fn run(paradigm: &ParadigmClient, user_input: &str) -> ExecutionOutcome {
    let sentences = split_into_sentences(user_input);
    tracing::info!(sentences = sentences.len(), "Running multi-sentence workflow");

    let mut answers = Vec::with_capacity(sentences.len());
    for (index, sentence) in sentences.iter().enumerate() {
        let request = DocumentSearchRequest::for_question(sentence);

        let answer = match paradigm.document_search(&request).await {
            Ok(result) => SentenceAnswer {
                sentence: sentence.clone(),
                answer: extract_answer(&result),
                succeeded: true,
            },
            Err(e) => {
                tracing::warn!(sentence = index + 1, error = %e, "Sentence search failed");
                SentenceAnswer {
                    sentence: sentence.clone(),
                    answer: format!("Error: Could not search for \"{}\"", sentence),
                    succeeded: false,
                }
            }
        };
        answers.push(answer);
    }

    let successful = answers.iter().filter(|a| a.succeeded).count();

    let workflow_results: Vec<Value> = answers
        .iter()
        .enumerate()
        .map(|(index, a)| {
            json!({
                "step": format!("sentence_{}_search", index + 1),
                "result": {
                    "content": a.answer,
                    "answer": a.answer,
                    "original_sentence": a.sentence,
                },
                "timestamp": timestamp(),
            })
        })
        .collect();

    ExecutionOutcome {
        result: json!({
            "workflow_results": workflow_results,
            "final_answer": format_final_answer(&answers),
            "final_context": {
                "total_sentences": sentences.len(),
                "successful_searches": successful,
            },
        }),
        explanation: format!(
            "Processed {} sentences with {} successful searches",
            sentences.len(),
            successful
        ),
    }
}

/// Split after `.`, `!` or `?` when followed by whitespace
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BREAK.find_iter(text) {
        // Punctuation is a single ASCII byte
        pieces.push(&text[start..boundary.start() + 1]);
        start = boundary.end();
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// First non-empty `content`, `answer` or `response` string
fn extract_answer(result: &Value) -> String {
    ["content", "answer", "response"]
        .iter()
        .find_map(|key| result.get(*key).and_then(|v| v.as_str()).filter(|s| !s.is_empty()))
        .unwrap_or(NO_ANSWER)
        .to_string()
}

fn format_final_answer(answers: &[SentenceAnswer]) -> String {
    let mut formatted = String::new();
    for a in answers {
        formatted.push_str(&format!("**Question:** {}\n\n", a.sentence));
        formatted.push_str(&format!("**Answer:** {}\n\n", a.answer));
        formatted.push_str("---\n\n");
    }
    formatted.trim().to_string()
}
