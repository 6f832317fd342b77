// eval-engine-rs/src/normalize.rs
// Reshapes structurally inconsistent model output into the canonical
// schema. Some reviewers drop the `evaluation_scores` wrapper and emit
// criterion objects directly at the top level; this module repairs that
// before the typed decode.

use serde_json::{Map, Value};

use eval_types_rs::EvaluationResult;

use crate::error::EvalError;

// Top-level fields of the canonical schema that must never be mistaken
// for criterion entries when rebuilding `evaluation_scores`.
const RESERVED_FIELDS: &[&str] = &[
    "ai_category",
    "business_impact",
    "technical_feasibility",
    "five_line_summary",
    "evaluation_scores",
    "debate_summary",
    "final_decision",
];

/// Best-effort structural repair. When `evaluation_scores` is absent,
/// every top-level object value carrying a `score` field is relocated
/// into a rebuilt map; recognized scalar/array fields stay where they
/// are. Objects without criterion shape, or input that already has the
/// wrapper, pass through unchanged.
pub fn normalize_result_value(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };

    if map.contains_key("evaluation_scores") {
        return Value::Object(map);
    }

    let mut scores = Map::new();
    let mut rest = Map::new();
    for (key, val) in map {
        let is_criterion = !RESERVED_FIELDS.contains(&key.as_str())
            && matches!(&val, Value::Object(obj) if obj.contains_key("score"));
        if is_criterion {
            scores.insert(key, val);
        } else {
            rest.insert(key, val);
        }
    }

    if scores.is_empty() {
        // Nothing criterion-shaped found; hand the object back as-is.
        return Value::Object(rest);
    }

    log::warn!(
        "model response missing evaluation_scores wrapper; relocated {} criterion entr{}",
        scores.len(),
        if scores.len() == 1 { "y" } else { "ies" }
    );
    rest.insert("evaluation_scores".to_string(), Value::Object(scores));
    Value::Object(rest)
}

/// Normalize and decode into the canonical typed result.
pub fn decode_result(value: Value) -> Result<EvaluationResult, EvalError> {
    let normalized = normalize_result_value(value);
    // serde's derived deserializer also accepts a sequence positionally,
    // so reject anything that is not a JSON object up front.
    if !normalized.is_object() {
        return Err(EvalError::Shape(format!(
            "expected a JSON object, got {}",
            type_name(&normalized)
        )));
    }
    serde_json::from_value(normalized).map_err(|err| EvalError::Shape(err.to_string()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
