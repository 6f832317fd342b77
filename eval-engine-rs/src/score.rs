// eval-engine-rs/src/score.rs
// Merging of the debate steps into one result, weighted scoring, and
// ordinal grade mapping.

use std::collections::BTreeSet;

use eval_types_rs::{Criterion, EvaluationResult, Grade, ScoreEntry};

// Neutral score used when no step produced a usable value.
const NEUTRAL_SCORE: i64 = 3;
const NO_SCORE_RATIONALE: &str = "평가 점수를 산출할 수 없습니다.";

/// Merge the debate steps into one result.
///
/// Three-way (final present): the final score wins per criterion when
/// > 0, else the initial score, else neutral 3; all three step scores
/// are retained for audit. Two-step fallback (review only): the
/// reviewer's score wins outright. Neither: the initial result passes
/// through unchanged.
pub fn merge_debate_results(
    initial: &EvaluationResult,
    review: Option<&EvaluationResult>,
    fin: Option<&EvaluationResult>,
) -> EvaluationResult {
    match (review, fin) {
        (_, Some(fin)) => merge_three_way(initial, review, fin),
        (Some(review), None) => merge_two_step(initial, review),
        (None, None) => initial.clone(),
    }
}

fn pick_field<'a>(primary: &'a str, fallback: &'a str) -> String {
    if primary.is_empty() {
        fallback.to_string()
    } else {
        primary.to_string()
    }
}

fn merge_three_way(
    initial: &EvaluationResult,
    review: Option<&EvaluationResult>,
    fin: &EvaluationResult,
) -> EvaluationResult {
    let mut merged = EvaluationResult {
        ai_category: pick_field(&fin.ai_category, &initial.ai_category),
        business_impact: pick_field(&fin.business_impact, &initial.business_impact),
        technical_feasibility: pick_field(&fin.technical_feasibility, &initial.technical_feasibility),
        five_line_summary: if fin.five_line_summary.is_empty() {
            initial.five_line_summary.clone()
        } else {
            fin.five_line_summary.clone()
        },
        debate_summary: review.and_then(|r| r.debate_summary.clone()),
        final_decision: fin.final_decision.clone(),
        ..Default::default()
    };

    let keys: BTreeSet<&String> = initial
        .evaluation_scores
        .keys()
        .chain(review.into_iter().flat_map(|r| r.evaluation_scores.keys()))
        .chain(fin.evaluation_scores.keys())
        .collect();

    for key in keys {
        let step_initial = initial.evaluation_scores.get(key);
        let step_review = review.and_then(|r| r.evaluation_scores.get(key));
        let step_final = fin.evaluation_scores.get(key);

        let score_initial = step_initial.map(|e| e.score);
        let score_review = step_review.map(|e| e.score);
        let score_final = step_final.map(|e| e.score);

        // The final decision wins; the initial evaluation backs it up.
        let merged_score = match (score_final, score_initial) {
            (Some(f), _) if f > 0 => f,
            (_, Some(i)) if i > 0 => i,
            _ => NEUTRAL_SCORE,
        };

        let mut rationale_parts = Vec::new();
        if let Some(entry) = step_initial.filter(|e| e.score > 0) {
            rationale_parts.push(format!("[Step 1 - 초기: {}점]\n{}", entry.score, entry.rationale));
        }
        if let Some(entry) = step_review.filter(|e| e.score > 0) {
            rationale_parts.push(format!("[Step 2 - 검토: {}점]\n{}", entry.score, entry.rationale));
        }
        if let Some(entry) = step_final.filter(|e| e.score > 0) {
            rationale_parts.push(format!("[Step 3 - 최종: {}점]\n{}", entry.score, entry.rationale));
        }
        let rationale = if rationale_parts.is_empty() {
            NO_SCORE_RATIONALE.to_string()
        } else {
            rationale_parts.join("\n\n")
        };

        merged.evaluation_scores.insert(
            key.clone(),
            ScoreEntry {
                score: merged_score,
                rationale,
                score_initial,
                score_review,
                score_final,
            },
        );
    }

    merged
}

fn merge_two_step(initial: &EvaluationResult, review: &EvaluationResult) -> EvaluationResult {
    let mut merged = EvaluationResult {
        ai_category: pick_field(&review.ai_category, &initial.ai_category),
        business_impact: pick_field(&review.business_impact, &initial.business_impact),
        technical_feasibility: pick_field(
            &review.technical_feasibility,
            &initial.technical_feasibility,
        ),
        five_line_summary: if review.five_line_summary.is_empty() {
            initial.five_line_summary.clone()
        } else {
            review.five_line_summary.clone()
        },
        debate_summary: review.debate_summary.clone(),
        final_decision: None,
        ..Default::default()
    };

    let keys: BTreeSet<&String> = initial
        .evaluation_scores
        .keys()
        .chain(review.evaluation_scores.keys())
        .collect();

    for key in keys {
        let step_initial = initial.evaluation_scores.get(key);
        let step_review = review.evaluation_scores.get(key);

        let score_initial = step_initial.map(|e| e.score).unwrap_or(0);
        let score_review = step_review.map(|e| e.score).unwrap_or(0);

        // The reviewer's score wins outright in the two-step fallback.
        let merged_score = if score_review > 0 {
            score_review
        } else if score_initial > 0 {
            score_initial
        } else {
            NEUTRAL_SCORE
        };

        let rationale_initial = step_initial.map(|e| e.rationale.as_str()).unwrap_or("");
        let rationale_review = step_review.map(|e| e.rationale.as_str()).unwrap_or("");
        let rationale = if score_initial > 0 && score_review > 0 && score_initial != score_review {
            format!(
                "[LLM A 초기: {}점]\n{}\n\n[LLM B 검토: {}점]\n{}",
                score_initial, rationale_initial, score_review, rationale_review
            )
        } else if score_review > 0 {
            format!("[합의: {}점]\n{}", score_review, rationale_review)
        } else if !rationale_initial.is_empty() {
            rationale_initial.to_string()
        } else {
            NO_SCORE_RATIONALE.to_string()
        };

        merged.evaluation_scores.insert(
            key.clone(),
            ScoreEntry {
                score: merged_score,
                rationale,
                score_initial: step_initial.map(|e| e.score),
                score_review: step_review.map(|e| e.score),
                score_final: None,
            },
        );
    }

    merged
}

/// Weighted average `sum(score * weight) / sum(weight)` over the criteria
/// present in both the result and the caller's list. Zero total weight
/// yields 0.0, which callers must treat as "no usable score".
pub fn calculate_weighted_score(result: &EvaluationResult, criteria: &[Criterion]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for criterion in criteria {
        if let Some(entry) = result.evaluation_scores.get(&criterion.key()) {
            weighted_sum += entry.score as f64 * criterion.weight;
            total_weight += criterion.weight;
        }
    }

    if total_weight == 0.0 {
        0.0
    } else {
        weighted_sum / total_weight
    }
}

/// Unweighted fallback: plain average over every score entry in the
/// result, regardless of the criteria list. Empty results yield 0.0.
pub fn calculate_simple_average(result: &EvaluationResult) -> f64 {
    if result.evaluation_scores.is_empty() {
        return 0.0;
    }
    let sum: i64 = result.evaluation_scores.values().map(|e| e.score).sum();
    sum as f64 / result.evaluation_scores.len() as f64
}

/// Grade from the fixed threshold table; shared by the weighted and the
/// simple paths.
pub fn grade_for(score: f64) -> Grade {
    Grade::from_score(score)
}
