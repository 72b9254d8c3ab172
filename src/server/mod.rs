//! HTTP and gRPC front-ends plus daemon configuration.
//!
//! Both front-ends are call-through shims over one shared
//! [`CompletionService`](crate::CompletionService): they decode their
//! wire format into a [`CompletionRequest`](crate::CompletionRequest),
//! invoke `submit`, and encode the envelope back out. No decision logic
//! lives here.

pub mod config;
pub mod convert;
pub mod http;
pub mod service;

/// Re-exported generated proto types.
pub mod proto {
    tonic::include_proto!("bifrost.v1");
}

pub use service::CompletionGrpc;
