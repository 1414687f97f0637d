//! HTTP shell: routing, the forwarding handler, and capture dispatch.
//!
//! The proxy serves exactly one route. The handler assembles and inserts
//! the audit record, forwards the raw body upstream, and returns the
//! upstream response while the capture engine works on its own copy in
//! the background.

mod headers;

pub use headers::{apply_cors, forwarded_headers, response_headers};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use crate::capture::{spawn_json_capture, spawn_stream_capture, tee};
use crate::config::{CHAT_COMPLETIONS_PATH, Config};
use crate::error::ProxyError;
use crate::prompt::assemble_prompts;
use crate::storage::{CompletionRecord, RecordStore};
use crate::types::ChatCompletionRequest;

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    client: reqwest::Client,
    store: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| ProxyError::HttpError(format!("failed to build upstream client: {err}")))?;
        Ok(Self {
            config: Arc::new(config),
            client,
            store,
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            CHAT_COMPLETIONS_PATH,
            post(chat_completions).options(preflight),
        )
        .with_state(state)
}

async fn chat_completions(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Parse a copy of the body for audit; forwarding uses the raw bytes,
    // so an unparsable body still proxies.
    let parsed = serde_json::from_slice::<ChatCompletionRequest>(&body).unwrap_or_else(|err| {
        tracing::debug!("request body not parsable for audit: {err}");
        ChatCompletionRequest::default()
    });

    let prompts = assemble_prompts(parsed.messages.as_deref());
    let record = CompletionRecord::new(
        parsed.model.clone(),
        prompts.system,
        prompts.user,
        Some(client_addr(&request_headers, peer)),
        user_agent(&request_headers),
    );
    let record_id = record.id.clone();

    if let Err(err) = state.store.insert(&record).await {
        tracing::warn!(record_id = %record_id, "failed to insert audit record: {err}");
    }

    let upstream = state
        .client
        .post(state.config.upstream_endpoint())
        .headers(forwarded_headers(&request_headers))
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!("upstream request failed: {err}");
            return bad_gateway(&err);
        }
    };

    let status = upstream.status();
    let out_headers = response_headers(upstream.headers());

    if parsed.stream {
        let (client_copy, capture_copy) = tee(upstream.bytes_stream());
        spawn_stream_capture(state.store.clone(), record_id, capture_copy);
        build_response(status, out_headers, Body::from_stream(client_copy))
    } else {
        let body = match upstream.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("failed to read upstream response: {err}");
                return bad_gateway(&err);
            }
        };
        if status.is_success() {
            spawn_json_capture(state.store.clone(), record_id, body.clone());
        }
        build_response(status, out_headers, Body::from(body))
    }
}

/// Fixed response for CORS preflight requests.
async fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    apply_cors(response.headers_mut());
    response
}

fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn bad_gateway(err: &reqwest::Error) -> Response {
    let body = serde_json::json!({
        "error": {
            "message": err.to_string(),
            "type": "upstream_error",
        }
    });
    let mut response = (StatusCode::BAD_GATEWAY, Json(body)).into_response();
    apply_cors(response.headers_mut());
    response
}

/// Client address for the audit record: first `x-forwarded-for` hop,
/// falling back to the socket peer.
fn client_addr(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
