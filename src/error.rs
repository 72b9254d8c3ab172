//! Bifrost error types

/// Bifrost error types
#[derive(Debug, thiserror::Error)]
pub enum BifrostError {
    // Outbound dispatch errors
    #[error("outbound throttle timed out before dispatch")]
    ThrottleTimeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("upstream error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The upstream body (or its nested answer) failed to decode even
    /// after JSON repair. Terminal; never retried.
    #[error("decode error: {0}")]
    Decode(String),

    /// The caller's deadline elapsed while an attempt was in flight.
    /// Carries the task id observed from the provider envelope, if any,
    /// so the orchestrator can attempt a best-effort stop call.
    #[error("upstream call cancelled")]
    Cancelled { task_id: Option<String> },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Collaborator errors
    #[error("cache store error: {0}")]
    Store(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BifrostError {
    /// Whether the error reflects a retryable upstream condition.
    ///
    /// Only 429/503/504 count; transport-level classification happens
    /// before an error is constructed (see the upstream client).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BifrostError::Api {
                status: 429 | 503 | 504,
                ..
            }
        )
    }

    /// Explicit upstream status carried by this error, if any.
    ///
    /// The orchestrator propagates such a status verbatim into the
    /// response envelope instead of collapsing it to 500.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BifrostError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for Bifrost operations
pub type Result<T> = std::result::Result<T, BifrostError>;
