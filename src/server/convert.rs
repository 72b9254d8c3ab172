//! Conversions between bifrost native types and protobuf types.

use crate::{ActionDirective, CompletionRequest, CompletionResult, ResponseEnvelope, ResponseMode};

use super::proto;

// =============================================================================
// From Proto → Native (incoming requests)
// =============================================================================

impl From<proto::CompleteRequest> for CompletionRequest {
    fn from(p: proto::CompleteRequest) -> Self {
        CompletionRequest {
            query: p.query,
            inputs: p.inputs.into_iter().collect(),
            user: p.user,
            response_mode: match p.response_mode.as_str() {
                "streaming" => ResponseMode::Streaming,
                _ => ResponseMode::Blocking,
            },
        }
    }
}

impl From<proto::Directive> for ActionDirective {
    fn from(p: proto::Directive) -> Self {
        ActionDirective {
            action: p.action,
            delay: p.delay,
            params: p.params,
        }
    }
}

impl From<proto::CompletionPayload> for CompletionResult {
    fn from(p: proto::CompletionPayload) -> Self {
        CompletionResult {
            content: p.content,
            functions: p.functions.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// Native → Proto (outgoing responses)
// =============================================================================

impl From<ActionDirective> for proto::Directive {
    fn from(d: ActionDirective) -> Self {
        proto::Directive {
            action: d.action,
            delay: d.delay,
            params: d.params,
        }
    }
}

impl From<CompletionResult> for proto::CompletionPayload {
    fn from(r: CompletionResult) -> Self {
        proto::CompletionPayload {
            content: r.content,
            functions: r.functions.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ResponseEnvelope> for proto::CompleteReply {
    fn from(envelope: ResponseEnvelope) -> Self {
        proto::CompleteReply {
            code: envelope.code,
            msg: envelope.msg,
            data: envelope.data.map(Into::into),
        }
    }
}
