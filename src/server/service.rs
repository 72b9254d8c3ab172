//! gRPC service implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use super::proto;
use super::proto::completion_server::Completion;
use crate::CompletionService;

/// gRPC front-end wrapping the shared [`CompletionService`].
pub struct CompletionGrpc {
    service: Arc<CompletionService>,
}

impl CompletionGrpc {
    /// Create a new gRPC front-end over the given service.
    pub fn new(service: Arc<CompletionService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl Completion for CompletionGrpc {
    async fn complete(
        &self,
        request: Request<proto::CompleteRequest>,
    ) -> Result<Response<proto::CompleteReply>, Status> {
        let envelope = self.service.submit(request.into_inner().into()).await;
        Ok(Response::new(envelope.into()))
    }
}
