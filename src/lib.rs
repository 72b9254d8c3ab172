//! Bifrost - completion gateway for an upstream generative API
//!
//! This crate sits between thin protocol front-ends (HTTP, gRPC) and a
//! single upstream completion provider. It normalizes inbound requests,
//! enforces a per-user rate limit, serves cached answers, dispatches to
//! the provider with retry/backoff and cancellation, and recovers a
//! strict [`CompletionResult`] from the provider's loosely-structured
//! answer payload.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bifrost::{
//!     CacheService, CompletionRequest, CompletionService, MemoryStore,
//!     ServiceConfig, UpstreamClient, UpstreamConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> bifrost::Result<()> {
//!     let upstream = UpstreamClient::new(UpstreamConfig::new("http://localhost", "app-key"))?;
//!     let cache = CacheService::new(Arc::new(MemoryStore::new(10_000)));
//!     let gateway = CompletionService::new(Arc::new(upstream), cache, ServiceConfig::default());
//!
//!     let envelope = gateway.submit(CompletionRequest::new("wave and say hi")).await;
//!     println!("{} {}", envelope.code, envelope.msg);
//!     Ok(())
//! }
//! ```

pub mod error;
#[cfg(feature = "server")]
pub mod server;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod upstream;
mod version;

// Re-export main types at crate root
pub use error::{BifrostError, Result};
pub use service::{CacheService, CompletionService, ServiceConfig};
pub use store::{KvStore, MemoryStore};
pub use types::{
    ActionDirective, CompletionRequest, CompletionResult, ResponseEnvelope, ResponseMode,
};
pub use upstream::{CompletionBackend, UpstreamClient, UpstreamConfig, UpstreamReply};
pub use version::{PKG_VERSION, version_string};
