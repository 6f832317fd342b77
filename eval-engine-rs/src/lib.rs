//! eval-engine-rs
//!
//! Multi-LLM evaluation orchestration engine for AI-project proposals.
//!
//! Given a proposal, a weighted criteria list and a category menu, the
//! engine builds prompts, drives one or two chat-completion backends
//! through a fixed initial -> review -> final debate protocol, recovers
//! structured JSON from free-text model output, validates and normalizes
//! it, and reduces it to a single weighted grade. The engine performs no
//! I/O of its own beyond the LLM HTTP calls; persisting the returned
//! result is the caller's job.

pub mod engine;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod score;
pub mod validate;

pub use engine::{BatchOutcome, EvaluationEngine, EvaluationOutcome, FailedEvaluation};
pub use error::EvalError;
pub use orchestrator::{DebateAudit, DebateMode, DebateOrchestrator, RetryPolicy};
pub use validate::{EvaluationQualityError, QualityViolation};
