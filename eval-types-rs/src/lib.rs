//! eval-types-rs
//!
//! Shared domain types for the AI-proposal evaluation engine:
//! proposals, evaluation criteria, technology categories, and the
//! canonical evaluation result schema exchanged with the LLM backends.

pub mod criteria;
pub mod proposal;
pub mod result;

pub use criteria::{default_categories, default_criteria, Category, Criterion};
pub use proposal::{Proposal, TechCapability};
pub use result::{EvaluationResult, Grade, ScoreEntry};
