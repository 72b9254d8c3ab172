//! HTTP front-end.
//!
//! `POST /completion` binds a JSON [`CompletionRequest`] and returns the
//! [`ResponseEnvelope`](crate::ResponseEnvelope) as the body of an HTTP
//! 200 response — the envelope's own `code` carries the outcome. Only a
//! malformed body or a missing `query` is rejected at the HTTP layer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use crate::{CompletionRequest, CompletionService};

/// Build the HTTP router over the shared service.
pub fn router(service: Arc<CompletionService>) -> Router {
    Router::new()
        .route("/completion", post(complete))
        .with_state(service)
}

async fn complete(
    State(service): State<Arc<CompletionService>>,
    Json(request): Json<CompletionRequest>,
) -> Response {
    if request.query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "query is required" })),
        )
            .into_response();
    }

    let envelope = service.submit(request).await;
    Json(envelope).into_response()
}
