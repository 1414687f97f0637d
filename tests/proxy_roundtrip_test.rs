//! End-to-end proxy tests against a mock upstream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chattap::ProxyError;
use chattap::config::Config;
use chattap::proxy::{AppState, router};
use chattap::storage::{CompletionRecord, MemoryStore, RecordStore};

const REQUEST_BODY: &str = r#"{"model":"gpt-4o","messages":[{"role":"system","content":"be brief"},{"role":"user","content":"hello"}]}"#;

async fn spawn_proxy(upstream_url: String, store: Arc<dyn RecordStore>) -> SocketAddr {
    let config = Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        upstream_url,
        db_path: String::new(),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(config, store).unwrap());
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// Capture lands asynchronously, strictly after the client response; poll
/// until the background task has written it.
async fn wait_for_output(store: &MemoryStore) -> Option<String> {
    for _ in 0..250 {
        let output = store
            .records()
            .into_iter()
            .find_map(|stored| stored.assistant_output);
        if output.is_some() {
            return output;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    None
}

#[tokio::test]
async fn non_streaming_reply_passes_through_and_is_captured() {
    let upstream = MockServer::start().await;
    let reply = r#"{"choices":[{"index":0,"message":{"content":"Hi"}}]}"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("hello"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(reply, "application/json"))
        .expect(1)
        .mount(&upstream)
        .await;

    let store = Arc::new(MemoryStore::new());
    let addr = spawn_proxy(upstream.uri(), store.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/v1/chat/completions"))
        .header("content-type", "application/json")
        .body(REQUEST_BODY)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    assert_eq!(response.text().await.unwrap(), reply);

    // The client already has the full response; the update lands after.
    assert_eq!(wait_for_output(&store).await.as_deref(), Some("Hi"));

    let stored = store.records().pop().unwrap();
    assert_eq!(stored.record.model.as_deref(), Some("gpt-4o"));
    assert_eq!(stored.record.system_prompt, "be brief");
    assert_eq!(stored.record.user_prompt, "hello");
    assert!(stored.record.client_addr.is_some());
}

#[tokio::test]
async fn streaming_reply_passes_through_verbatim_and_is_captured() {
    let sse_body = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"He\"}}]}\n\n\
                    data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"llo\"}}]}\n\n\
                    data: [DONE]\n\n";
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&upstream)
        .await;

    let store = Arc::new(MemoryStore::new());
    let addr = spawn_proxy(upstream.uri(), store.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/v1/chat/completions"))
        .header("content-type", "application/json")
        .body(r#"{"model":"gpt-4o","stream":true,"messages":[{"role":"user","content":"hi"}]}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    // The client copy is byte-identical to the upstream body.
    assert_eq!(response.text().await.unwrap(), sse_body);

    assert_eq!(wait_for_output(&store).await.as_deref(), Some("Hello"));
}

#[tokio::test]
async fn upstream_error_status_passes_through() {
    let upstream = MockServer::start().await;
    let reply = r#"{"error":{"message":"model not found"}}"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_raw(reply, "application/json"))
        .mount(&upstream)
        .await;

    let store = Arc::new(MemoryStore::new());
    let addr = spawn_proxy(upstream.uri(), store.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/v1/chat/completions"))
        .body(REQUEST_BODY)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await.unwrap(), reply);

    // Prompt capture still happened; no assistant output for a failure.
    let stored = store.records().pop().unwrap();
    assert_eq!(stored.record.user_prompt, "hello");
    assert!(stored.assistant_output.is_none());
}

/// A store whose writes always fail, to prove audit failures stay off the
/// forward path.
struct FailStore;

#[async_trait]
impl RecordStore for FailStore {
    async fn insert(&self, _record: &CompletionRecord) -> Result<(), ProxyError> {
        Err(ProxyError::StorageError("insert rejected".to_string()))
    }

    async fn update_output(&self, _id: &str, _output: &str) -> Result<(), ProxyError> {
        Err(ProxyError::StorageError("update rejected".to_string()))
    }
}

#[tokio::test]
async fn insert_failure_does_not_block_forwarding() {
    let upstream = MockServer::start().await;
    let reply = r#"{"choices":[{"index":0,"message":{"content":"still here"}}]}"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(reply, "application/json"))
        .expect(1)
        .mount(&upstream)
        .await;

    let addr = spawn_proxy(upstream.uri(), Arc::new(FailStore)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/v1/chat/completions"))
        .body(REQUEST_BODY)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), reply);
}

#[tokio::test]
async fn preflight_gets_fixed_cors_response() {
    let upstream = MockServer::start().await;
    let addr = spawn_proxy(upstream.uri(), Arc::new(MemoryStore::new())).await;

    let response = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("http://{addr}/v1/chat/completions"),
        )
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 204);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-methods")
            .unwrap(),
        "POST, OPTIONS"
    );
}

#[tokio::test]
async fn unparsable_request_body_still_proxies() {
    let upstream = MockServer::start().await;
    let reply = r#"{"choices":[]}"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(reply, "application/json"))
        .expect(1)
        .mount(&upstream)
        .await;

    let store = Arc::new(MemoryStore::new());
    let addr = spawn_proxy(upstream.uri(), store.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/v1/chat/completions"))
        .body("this is not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let stored = store.records().pop().unwrap();
    assert_eq!(stored.record.user_prompt, "");
    assert!(stored.record.model.is_none());
}
