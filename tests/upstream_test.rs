//! Wiremock integration tests for [`UpstreamClient`].
//!
//! These tests verify correct HTTP interaction — auth, body shape,
//! retry/backoff classification, JSON repair, throttling, and
//! deadline-bounded cancellation — using mocked provider responses.

use std::time::{Duration, Instant};

use bifrost::{BifrostError, CompletionRequest, UpstreamClient, UpstreamConfig};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> UpstreamClient {
    UpstreamClient::new(
        UpstreamConfig::new(server.uri(), "test-key")
            .timeout(Duration::from_secs(5))
            .initial_backoff(Duration::from_millis(10)),
    )
    .expect("client should build")
}

fn request() -> CompletionRequest {
    CompletionRequest::new("wave and say hi")
        .user("u1")
        .normalized()
}

#[tokio::test]
async fn complete_sends_bearer_auth_and_exact_body() {
    let server = MockServer::start().await;

    let expected_body = serde_json::json!({
        "query": "wave and say hi",
        "inputs": {},
        "user": "u1",
        "response_mode": "blocking",
    });

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_json(&expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task_id": "task-1",
            "answer": "{\"content\":\"hi\"}",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server).complete(&request()).await.unwrap();
    assert_eq!(reply.task_id, "task-1");
    assert_eq!(reply.answer, "{\"content\":\"hi\"}");
}

#[tokio::test]
async fn complete_repairs_noisy_envelope() {
    let server = MockServer::start().await;

    let body = r#"Sure, here you go: {"task_id":"task-2","answer":"ok"} hope that helps"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let reply = client_for(&server).complete(&request()).await.unwrap();
    assert_eq!(reply.task_id, "task-2");
    assert_eq!(reply.answer, "ok");
}

#[tokio::test]
async fn complete_repairs_nested_answer_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task_id": "task-3",
            "answer": "noise {\"content\":\"ok\"} trailing",
        })))
        .mount(&server)
        .await;

    let reply = client_for(&server).complete(&request()).await.unwrap();
    assert_eq!(reply.answer, "{\"content\":\"ok\"}");
}

#[tokio::test]
async fn complete_retries_retryable_status_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task_id": "task-4",
            "answer": "{\"content\":\"recovered\"}",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server).complete(&request()).await.unwrap();
    assert_eq!(reply.task_id, "task-4");
}

#[tokio::test]
async fn complete_gives_up_after_attempt_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server).complete(&request()).await.unwrap_err();
    match err {
        BifrostError::Api { status, .. } => assert_eq!(status, 503),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn complete_does_not_retry_terminal_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).complete(&request()).await.unwrap_err();
    match err {
        BifrostError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad request");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn complete_treats_unrepairable_body_as_terminal_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(err, BifrostError::Decode(_)));
}

#[tokio::test]
async fn complete_cancels_at_deadline_without_blocking_full_latency() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(serde_json::json!({ "task_id": "late", "answer": "{}" })),
        )
        .mount(&server)
        .await;

    let client = UpstreamClient::new(
        UpstreamConfig::new(server.uri(), "test-key").timeout(Duration::from_millis(150)),
    )
    .unwrap();

    let started = Instant::now();
    let err = client.complete(&request()).await.unwrap_err();
    let elapsed = started.elapsed();

    match err {
        BifrostError::Cancelled { task_id } => assert!(task_id.is_none()),
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert!(elapsed < Duration::from_secs(2), "cancel was not prompt: {elapsed:?}");
}

#[tokio::test]
async fn throttle_timeout_fails_before_any_network_io() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task_id": "task-5",
            "answer": "{\"content\":\"ok\"}",
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Burst of 1 at 1 req/s: the second call cannot get a token within
    // its 100ms deadline and must fail without reaching the server.
    let client = UpstreamClient::new(
        UpstreamConfig::new(server.uri(), "test-key")
            .rate(1, 1)
            .timeout(Duration::from_millis(100)),
    )
    .unwrap();

    client.complete(&request()).await.unwrap();

    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, BifrostError::ThrottleTimeout));
}

#[tokio::test]
async fn cancel_posts_stop_for_task() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages/task-9/stop"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_json(&serde_json::json!({ "user": "u1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).cancel("task-9", "u1").await.unwrap();
}

#[tokio::test]
async fn cancel_surfaces_provider_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages/task-9/stop"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown task"))
        .mount(&server)
        .await;

    let err = client_for(&server).cancel("task-9", "u1").await.unwrap_err();
    match err {
        BifrostError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "unknown task");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_conversation_targets_conversation_resource() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/conversations/conv-1"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .delete_conversation("conv-1", "u1")
        .await
        .unwrap();
}
