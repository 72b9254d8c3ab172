//! Heuristic JSON repair for noisy upstream payloads.
//!
//! The provider occasionally surrounds a valid JSON object with
//! extraneous prose ("Sure! Here is the answer: {...} Hope that helps").
//! Before rejecting such a body, the client extracts the substring
//! between the first `{` and the last `}` and tries that instead. The
//! same repair runs independently on the nested answer payload, since
//! the provider wraps a JSON-encoded answer inside a text field of its
//! own envelope.

/// Extract the candidate JSON object between the first `{` and the last
/// `}` of `input`, returning it only if it parses as JSON.
pub fn extract_json_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    if end <= start {
        return None;
    }

    let candidate = &input[start..=end];
    if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
        Some(candidate)
    } else {
        None
    }
}
