// eval-engine-rs/src/error.rs

use llm_client_rs::LlmError;
use thiserror::Error;

/// Failures of one evaluation run.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// An LLM call failed after the retry budget was exhausted.
    #[error("llm backend call failed: {0}")]
    Backend(#[from] LlmError),

    /// No JSON object could be recovered from the model text, even after
    /// the mechanical repair pass. Carries truncated copies of the raw
    /// response and both extraction attempts for diagnostics.
    #[error("could not parse model response as JSON: {message}")]
    ExtractParse {
        message: String,
        raw: String,
        extracted: String,
        repaired: String,
    },

    /// The parsed JSON does not decode into the canonical result shape.
    #[error("model response has unusable shape: {0}")]
    Shape(String),

    /// The final-synthesis step (backend A, step 3) failed. Fatal for
    /// this evaluation; unlike reviewer failures it never degrades.
    #[error("final synthesis step failed: {0}")]
    FinalStepFailed(String),
}

impl EvalError {
    /// Whether the per-call retry wrapper should try again. Parse and
    /// shape defects are retried alongside transport faults; only
    /// terminal request errors (bad credentials etc.) fail fast.
    pub fn is_retryable(&self) -> bool {
        match self {
            EvalError::Backend(inner) => inner.is_retryable(),
            EvalError::ExtractParse { .. } | EvalError::Shape(_) => true,
            EvalError::FinalStepFailed(_) => false,
        }
    }
}
