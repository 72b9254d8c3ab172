//! Schema-tolerant extraction of the upstream answer.
//!
//! The answer body is untrusted and frequently sloppy: directives with
//! missing fields, numbers where strings belong, params as nested
//! objects. Extraction type-checks every field individually and defaults
//! on mismatch — a partially-malformed directive still yields a
//! best-effort directive rather than discarding the whole answer.
//! Extraction is pure: the same input always yields the same result.

use serde_json::{Map, Value};

use crate::{ActionDirective, BifrostError, CompletionResult, Result};

/// Parse the answer body into a JSON object.
///
/// The body has already been through JSON repair at the client; here a
/// parse failure (or a non-object value) is terminal.
pub fn parse_answer(answer: &str) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(answer).map_err(|err| BifrostError::Decode(err.to_string()))?;
    match value {
        Value::Object(object) => Ok(object),
        other => Err(BifrostError::Decode(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Extract the normalized result from a decoded answer object.
pub fn extract_result(answer: &Map<String, Value>) -> CompletionResult {
    let content = answer
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let functions = answer
        .get("functions")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(directive_from).collect())
        .unwrap_or_default();

    CompletionResult { content, functions }
}

/// Build a directive from one `functions` element. Non-object elements
/// are dropped; inside an object every field falls back individually.
fn directive_from(value: &Value) -> Option<ActionDirective> {
    let object = value.as_object()?;

    let action = object
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let delay = object.get("delay").and_then(delay_millis).unwrap_or(0);

    let params = object.get("params").and_then(param_text);

    Some(ActionDirective {
        action,
        delay,
        params,
    })
}

/// Accept integer or float delays; negative and non-numeric values
/// default to 0.
fn delay_millis(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|millis| *millis >= 0.0)
            .map(|millis| millis as u64)
    })
}

/// String params pass through; object params are flattened to their
/// JSON text form; anything else is dropped.
fn param_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(_) => serde_json::to_string(value).ok(),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
