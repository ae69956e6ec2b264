//! Structured-output parsing: best-effort recovery of a JSON object from free-form model text.
//!
//! Never fails: the worst case is a fallback object carrying the raw text.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

pub const PARSE_FAILURE_SUGGESTION: &str = "Could not parse response as JSON.";

fn json_object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // First `{` to last `}`, across lines.
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex is valid"))
}

/// Parses model output into a JSON object.
///
/// 1. Strict parse of the whole string (after stripping markdown code fences).
/// 2. Strict parse of the greedy `{ … }` span inside the text.
/// 3. Fallback `{suggestions: [PARSE_FAILURE_SUGGESTION], optimized_resume: raw}`.
pub fn parse_json_response(raw: &str) -> Map<String, Value> {
    if let Some(object) = parse_object(strip_json_fences(raw)) {
        return object;
    }

    if let Some(object) = json_object_regex()
        .find(raw)
        .and_then(|m| parse_object(m.as_str()))
    {
        return object;
    }

    tracing::warn!("Model output is not valid JSON; falling back to raw text");
    let mut fallback = Map::new();
    fallback.insert("suggestions".into(), json!([PARSE_FAILURE_SUGGESTION]));
    fallback.insert("optimized_resume".into(), Value::String(raw.to_string()));
    fallback
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
