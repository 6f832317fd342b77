// eval-engine-rs/src/extract.rs
// Recovers a JSON object from arbitrary model text, with a mechanical
// repair pass for the syntax defects models most often produce.

use regex::Regex;
use serde_json::Value;

use crate::error::EvalError;

// How much raw material to keep in parse-failure diagnostics.
const DIAGNOSTIC_PREFIX: usize = 500;

/// Pull the most plausible JSON substring out of `text`.
///
/// Text that already parses whole (the instructed response format) is
/// returned as-is. Otherwise, strategies in order:
/// 1. content of a ```json fenced block
/// 2. content of any fenced block
/// 3. first balanced `{...}` region matched by a brace-scanning regex
///    that also parses as JSON
/// 4. the substring from the first `{` to the last `}`
/// 5. the trimmed raw text, as a last resort
pub fn extract_json_text(text: &str) -> String {
    let trimmed = text.trim();
    if serde_json::from_str::<Value>(trimmed).is_ok() {
        return trimmed.to_string();
    }

    if let Some(idx) = text.find("```json") {
        let rest = &text[idx + "```json".len()..];
        let inner = match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        return inner.trim().to_string();
    }

    if let Some(idx) = text.find("```") {
        let rest = &text[idx + "```".len()..];
        let inner = match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        return inner.trim().to_string();
    }

    // One level of brace nesting, validated by an actual parse attempt.
    let brace_pattern =
        Regex::new(r"(?s)\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("static pattern compiles");
    for candidate in brace_pattern.find_iter(text) {
        if serde_json::from_str::<Value>(candidate.as_str()).is_ok() {
            return candidate.as_str().to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return text[start..=end].to_string();
        }
    }

    text.trim().to_string()
}

/// Mechanical repair of common JSON defects: trailing commas before a
/// closing brace/bracket, and stray text outside the outermost braces.
pub fn repair_json_text(text: &str) -> String {
    let trailing_comma = Regex::new(r",\s*([}\]])").expect("static pattern compiles");
    let repaired = trailing_comma.replace_all(text, "$1").into_owned();

    if let (Some(start), Some(end)) = (repaired.find('{'), repaired.rfind('}')) {
        if end > start {
            return repaired[start..=end].to_string();
        }
    }
    repaired
}

/// Extract and parse a JSON object from raw model output. A first parse
/// failure triggers the repair pass; a second failure is fatal for this
/// call and carries both attempts for diagnostics.
pub fn parse_model_response(raw: &str) -> Result<Value, EvalError> {
    let extracted = extract_json_text(raw);
    match serde_json::from_str::<Value>(&extracted) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let repaired = repair_json_text(&extracted);
            match serde_json::from_str::<Value>(&repaired) {
                Ok(value) => {
                    log::debug!("model JSON required repair: {}", first_err);
                    Ok(value)
                }
                Err(second_err) => Err(EvalError::ExtractParse {
                    message: second_err.to_string(),
                    raw: truncate(raw),
                    extracted: truncate(&extracted),
                    repaired: truncate(&repaired),
                }),
            }
        }
    }
}

fn truncate(s: &str) -> String {
    if s.len() <= DIAGNOSTIC_PREFIX {
        return s.to_string();
    }
    // Back off to a char boundary.
    let mut end = DIAGNOSTIC_PREFIX;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
