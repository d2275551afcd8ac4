// Workflow dispatcher
// Runs parameter objects against the Paradigm API

pub mod context;
pub mod executor;
pub mod multi_sentence;
pub mod step;

use thiserror::Error;

use crate::error::UpstreamError;

pub use context::WorkflowContext;
pub use executor::{ExecutionOutcome, StepOutcome, WorkflowExecutor};
pub use step::StepKind;

/// Workflow type that routes `user_input` to the per-sentence search
pub const MULTI_SENTENCE_WORKFLOW: &str = "multi_sentence_workflow";

/// Failures that abort a whole workflow request
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow parameters must be a JSON object")]
    InvalidParameters,

    #[error("Single operation failed: {0}")]
    SingleOperation(String),

    #[error("Document search failed: {0}")]
    DocumentSearch(String),

    #[error("Unable to determine workflow operation type. Please provide either a steps array or specify the operation type.")]
    UndeterminedOperation,
}

/// Failure of one step; recorded and the workflow continues
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Unknown or unsupported step type: {0}")]
    Unsupported(String),
}
