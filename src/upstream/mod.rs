//! Upstream completion provider: client, throttle, and answer repair.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{CompletionRequest, Result};

mod client;
mod repair;
mod throttle;

pub use client::{UpstreamClient, UpstreamConfig};
pub use repair::extract_json_object;
pub use throttle::Throttle;

/// The provider's response envelope for one blocking completion call.
///
/// Transient — exists only during one orchestration call. Every field is
/// decoded tolerantly; the provider omits most of them depending on the
/// application behind the endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamReply {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub mode: String,
    /// Raw answer body. Expected to itself be a JSON object, but the
    /// provider sometimes surrounds it with prose; the client repairs it
    /// before handing it over (see [`extract_json_object`]).
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Outbound contract the orchestrator dispatches through.
///
/// [`UpstreamClient`] is the production implementation; tests substitute
/// mocks to exercise failure and cancellation paths.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Issue one blocking completion call, with throttling, retry, and
    /// deadline-bounded cancellation.
    async fn complete(&self, request: &CompletionRequest) -> Result<UpstreamReply>;

    /// Ask the provider to stop the task identified by `task_id`.
    ///
    /// Best-effort by contract: the orchestrator logs and discards the
    /// outcome.
    async fn cancel(&self, task_id: &str, user: &str) -> Result<()>;
}
