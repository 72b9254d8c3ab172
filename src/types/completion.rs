//! Request, result, and envelope types.
//!
//! [`CompletionResult`] is the one payload shape shared by every surface:
//! it is what gets cached, what the gRPC reply carries, and what the HTTP
//! response's `data` field holds. All types are plain owned values — a
//! result handed to a caller never aliases cache-internal storage.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder identity used when a request arrives without a user.
pub const DEFAULT_USER: &str = "default_user";

/// How the upstream provider should deliver its answer.
///
/// Only [`Blocking`](ResponseMode::Blocking) is semantically implemented;
/// the variant exists so the wire field round-trips faithfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    #[default]
    Blocking,
    Streaming,
}

/// One inbound completion request.
///
/// Constructed by a front-end from its wire format, then normalized by
/// the orchestrator (empty `user` becomes [`DEFAULT_USER`]); immutable
/// afterwards. Serializes to the exact JSON body the upstream expects:
/// `{query, inputs, user, response_mode}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub query: String,
    #[serde(default)]
    pub inputs: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(default, deserialize_with = "mode_or_default")]
    pub response_mode: ResponseMode,
}

/// Tolerant decode for `response_mode`: the field arrives as free text
/// from some callers ("", "blocking", "streaming"); anything that is not
/// exactly "streaming" falls back to blocking.
fn mode_or_default<'de, D>(deserializer: D) -> Result<ResponseMode, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    Ok(match text.as_str() {
        "streaming" => ResponseMode::Streaming,
        _ => ResponseMode::Blocking,
    })
}

impl CompletionRequest {
    /// Create a request with the given query and defaults elsewhere.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            inputs: HashMap::new(),
            user: String::new(),
            response_mode: ResponseMode::default(),
        }
    }

    /// Attach a free-form context input.
    pub fn input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    /// Set the user identifier.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Apply request defaults: an absent user becomes [`DEFAULT_USER`].
    pub fn normalized(mut self) -> Self {
        if self.user.is_empty() {
            self.user = DEFAULT_USER.to_string();
        }
        self
    }
}

/// One structured action instruction extracted from the upstream answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDirective {
    #[serde(default)]
    pub action: String,
    /// Delay before the action fires, in milliseconds.
    #[serde(default)]
    pub delay: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
}

/// Normalized completion answer: free text plus ordered directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub functions: Vec<ActionDirective>,
}

/// Uniform response envelope returned by [`submit`](crate::CompletionService::submit).
///
/// `code` is HTTP-style (200 success, 429 rate limited, 499 cancelled,
/// 500 internal/upstream failure, or a verbatim upstream status). `data`
/// serializes as JSON `null` whenever `code != 200` — null is the
/// explicit no-payload signal, distinct from an empty-but-present result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub code: i32,
    pub msg: String,
    pub data: Option<CompletionResult>,
}

impl ResponseEnvelope {
    /// Successful completion.
    pub fn success(data: CompletionResult) -> Self {
        Self {
            code: 200,
            msg: "success".to_string(),
            data: Some(data),
        }
    }

    /// Successful completion served from cache.
    pub fn cached(data: CompletionResult) -> Self {
        Self {
            code: 200,
            msg: "success (cached)".to_string(),
            data: Some(data),
        }
    }

    /// Failure with the given status and message; `data` is null.
    pub fn failure(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_defaults_empty_user() {
        let request = CompletionRequest::new("hi").normalized();
        assert_eq!(request.user, DEFAULT_USER);
        assert_eq!(request.response_mode, ResponseMode::Blocking);
        assert!(request.inputs.is_empty());
    }

    #[test]
    fn normalized_keeps_explicit_user() {
        let request = CompletionRequest::new("hi").user("u1").normalized();
        assert_eq!(request.user, "u1");
    }

    #[test]
    fn request_serializes_upstream_body_shape() {
        let request = CompletionRequest::new("wave")
            .input("scene", "greeting")
            .user("u1")
            .normalized();
        let body: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(body["query"], "wave");
        assert_eq!(body["inputs"]["scene"], "greeting");
        assert_eq!(body["user"], "u1");
        assert_eq!(body["response_mode"], "blocking");
    }

    #[test]
    fn request_decodes_with_missing_optional_fields() {
        let request: CompletionRequest = serde_json::from_str(r#"{"query": "hi"}"#).unwrap();
        assert_eq!(request.query, "hi");
        assert!(request.user.is_empty());
        assert_eq!(request.response_mode, ResponseMode::Blocking);
    }

    #[test]
    fn request_tolerates_empty_response_mode() {
        let request: CompletionRequest =
            serde_json::from_str(r#"{"query": "hi", "response_mode": ""}"#).unwrap();
        assert_eq!(request.response_mode, ResponseMode::Blocking);

        let request: CompletionRequest =
            serde_json::from_str(r#"{"query": "hi", "response_mode": "streaming"}"#).unwrap();
        assert_eq!(request.response_mode, ResponseMode::Streaming);
    }

    #[test]
    fn failure_envelope_serializes_null_data() {
        let envelope = ResponseEnvelope::failure(429, "rate limit exceeded");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["code"], 429);
        assert!(json["data"].is_null());
    }

    #[test]
    fn directive_omits_absent_params() {
        let directive = ActionDirective {
            action: "handsup".into(),
            delay: 0,
            params: None,
        };
        let json = serde_json::to_value(&directive).unwrap();
        assert!(json.get("params").is_none());
    }
}
