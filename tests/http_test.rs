//! HTTP front-end tests: bind the axum router on an ephemeral port and
//! drive it with a real client against a wiremock provider.
#![cfg(feature = "server")]

use std::sync::Arc;
use std::time::Duration;

use bifrost::server::http;
use bifrost::{
    CacheService, CompletionService, MemoryStore, ResponseEnvelope, ServiceConfig, UpstreamClient,
    UpstreamConfig,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(upstream_uri: String) -> (String, tokio::task::JoinHandle<()>) {
    let upstream = UpstreamClient::new(
        UpstreamConfig::new(upstream_uri, "test-key").timeout(Duration::from_secs(5)),
    )
    .unwrap();
    let service = Arc::new(CompletionService::new(
        Arc::new(upstream),
        CacheService::new(Arc::new(MemoryStore::new(64))),
        ServiceConfig::default(),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        axum::serve(listener, http::router(service)).await.unwrap();
    });
    (address, handle)
}

#[tokio::test]
async fn post_completion_returns_envelope_body() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task_id": "task-1",
            "answer": "{\"content\":\"hello\",\"functions\":[]}",
        })))
        .mount(&provider)
        .await;

    let (address, handle) = serve(provider.uri()).await;

    let response = reqwest::Client::new()
        .post(format!("{address}/completion"))
        .json(&serde_json::json!({ "query": "hi", "user": "u1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let envelope: ResponseEnvelope = response.json().await.unwrap();
    assert_eq!(envelope.code, 200);
    assert_eq!(envelope.msg, "success");
    assert_eq!(envelope.data.unwrap().content, "hello");

    handle.abort();
}

#[tokio::test]
async fn missing_query_is_rejected_with_400() {
    let provider = MockServer::start().await;
    let (address, handle) = serve(provider.uri()).await;

    let response = reqwest::Client::new()
        .post(format!("{address}/completion"))
        .json(&serde_json::json!({ "query": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);

    handle.abort();
}

#[tokio::test]
async fn failure_envelope_carries_null_data_over_http() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task_id": "task-2",
            "answer": "not json",
        })))
        .mount(&provider)
        .await;

    let (address, handle) = serve(provider.uri()).await;

    let response = reqwest::Client::new()
        .post(format!("{address}/completion"))
        .json(&serde_json::json!({ "query": "hi", "user": "u1" }))
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 500);
    assert!(body["data"].is_null());

    handle.abort();
}
