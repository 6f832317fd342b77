// eval-types-rs/src/result.rs
// Canonical evaluation result schema and ordinal grading.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Score + rationale for one criterion, with the per-step debate audit
/// trail retained alongside the merged value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Merged score, 1..=5.
    pub score: i64,
    /// Missing rationales decode as empty and are left for the quality
    /// validator to flag, rather than failing the decode.
    #[serde(default)]
    pub rationale: String,
    /// Step 1 score (primary model, initial evaluation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_initial: Option<i64>,
    /// Step 2 score (reviewer model).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_review: Option<i64>,
    /// Step 3 score (primary model, final synthesis).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_final: Option<i64>,
}

impl ScoreEntry {
    pub fn new(score: i64, rationale: impl Into<String>) -> Self {
        Self {
            score,
            rationale: rationale.into(),
            score_initial: None,
            score_review: None,
            score_final: None,
        }
    }
}

/// The canonical result shape every model response is normalized into.
///
/// `debate_summary` is only produced by the review step and
/// `final_decision` only by the final-synthesis step; both are absent in
/// single-model mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(default)]
    pub ai_category: String,
    #[serde(default)]
    pub business_impact: String,
    #[serde(default)]
    pub technical_feasibility: String,
    #[serde(default)]
    pub five_line_summary: Vec<String>,
    #[serde(default)]
    pub evaluation_scores: BTreeMap<String, ScoreEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debate_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<String>,
}

/// Ordinal grade derived from the weighted score average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

impl Grade {
    /// Fixed 5-bin threshold table. Boundary values map to the higher
    /// grade (4.5 -> S, 3.5 -> A, ...).
    pub fn from_score(avg: f64) -> Self {
        if avg >= 4.5 {
            Grade::S
        } else if avg >= 3.5 {
            Grade::A
        } else if avg >= 2.5 {
            Grade::B
        } else if avg >= 1.5 {
            Grade::C
        } else {
            Grade::D
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
