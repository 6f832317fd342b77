// eval-engine-rs/src/validate.rs
// Advisory schema/range checker over the canonical result. Violations
// are collected into one structured error; the orchestrator logs them
// and continues - this check surfaces model drift, it never blocks.

use std::fmt;

use eval_types_rs::{Category, Criterion, EvaluationResult};
use thiserror::Error;

const MIN_RATIONALE_CHARS: usize = 10;
const SUMMARY_LINES: usize = 5;

/// One schema/range violation found in a result.
#[derive(Debug, Clone, PartialEq)]
pub enum QualityViolation {
    MissingField(&'static str),
    UnknownCategory { found: String },
    SummaryCardinality { found: usize },
    MissingCriterion { key: String },
    ScoreOutOfRange { key: String, score: i64 },
    RationaleTooShort { key: String, chars: usize },
}

impl fmt::Display for QualityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityViolation::MissingField(name) => {
                write!(f, "missing or empty field: {}", name)
            }
            QualityViolation::UnknownCategory { found } => {
                write!(f, "ai_category {:?} is not in the valid category set", found)
            }
            QualityViolation::SummaryCardinality { found } => {
                write!(f, "five_line_summary has {} lines, expected 5", found)
            }
            QualityViolation::MissingCriterion { key } => {
                write!(f, "evaluation_scores missing criterion {:?}", key)
            }
            QualityViolation::ScoreOutOfRange { key, score } => {
                write!(f, "score for {:?} is {}, outside 1..=5", key, score)
            }
            QualityViolation::RationaleTooShort { key, chars } => {
                write!(
                    f,
                    "rationale for {:?} has {} chars, expected at least {}",
                    key, chars, MIN_RATIONALE_CHARS
                )
            }
        }
    }
}

/// All violations of one result, as a single distinguishable error.
#[derive(Debug, Clone, Error)]
#[error("evaluation quality check failed: {}", summary(.violations))]
pub struct EvaluationQualityError {
    pub violations: Vec<QualityViolation>,
}

fn summary(violations: &[QualityViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a normalized result against the caller's criteria and the valid
/// category set. Collects every violation instead of stopping at the
/// first.
pub fn validate_result(
    result: &EvaluationResult,
    criteria: &[Criterion],
    categories: &[Category],
) -> Result<(), EvaluationQualityError> {
    let mut violations = Vec::new();

    if result.ai_category.is_empty() {
        violations.push(QualityViolation::MissingField("ai_category"));
    } else if !categories.iter().any(|c| c.name == result.ai_category) {
        violations.push(QualityViolation::UnknownCategory {
            found: result.ai_category.clone(),
        });
    }

    if result.business_impact.trim().is_empty() {
        violations.push(QualityViolation::MissingField("business_impact"));
    }
    if result.technical_feasibility.trim().is_empty() {
        violations.push(QualityViolation::MissingField("technical_feasibility"));
    }

    if result.five_line_summary.is_empty() {
        violations.push(QualityViolation::MissingField("five_line_summary"));
    } else if result.five_line_summary.len() != SUMMARY_LINES {
        violations.push(QualityViolation::SummaryCardinality {
            found: result.five_line_summary.len(),
        });
    }

    if result.evaluation_scores.is_empty() {
        violations.push(QualityViolation::MissingField("evaluation_scores"));
    }

    for criterion in criteria {
        let key = criterion.key();
        match result.evaluation_scores.get(&key) {
            None => violations.push(QualityViolation::MissingCriterion { key }),
            Some(entry) => {
                if !(1..=5).contains(&entry.score) {
                    violations.push(QualityViolation::ScoreOutOfRange {
                        key: key.clone(),
                        score: entry.score,
                    });
                }
                let chars = entry.rationale.chars().count();
                if chars < MIN_RATIONALE_CHARS {
                    violations.push(QualityViolation::RationaleTooShort { key, chars });
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(EvaluationQualityError { violations })
    }
}
