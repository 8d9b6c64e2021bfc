//! Test utilities for budgie-core
//!
//! Provides a mock Gemini server that answers `generateContent` calls with a
//! fixed status and body, and records what it received.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tokio::sync::oneshot;

/// A request seen by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Model name taken from the URL
    pub model: String,
    /// Value of the `x-goog-api-key` header
    pub api_key: Option<String>,
    /// Text of the first user part
    pub prompt: String,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Value,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Mock Gemini server for testing and development
pub struct MockGeminiServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// Answer every call with a successful candidate containing `text`
    pub async fn start_ok(text: &str) -> Self {
        Self::start_with(200, candidate_body(text)).await
    }

    /// Answer every call with a Gemini-style error body
    pub async fn start_error(status: u16, api_status: &str, message: &str) -> Self {
        Self::start_with(
            status,
            serde_json::json!({
                "error": { "code": status, "message": message, "status": api_status }
            }),
        )
        .await
    }

    /// Answer every call with `status` and the JSON `body`
    pub async fn start_with(status: u16, body: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status: StatusCode::from_u16(status).unwrap(),
            body,
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/v1beta/models/:model_action", post(handle_generate))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A `generateContent` success body carrying one text part
pub fn candidate_body(text: &str) -> Value {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

/// The 400 body Gemini returns for a rejected API key
pub fn rejected_key_body() -> Value {
    serde_json::json!({
        "error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT",
            "details": [{
                "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                "reason": "API_KEY_INVALID",
                "domain": "googleapis.com",
                "metadata": { "service": "generativelanguage.googleapis.com" }
            }]
        }
    })
}

async fn handle_generate(
    State(state): State<MockState>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> impl IntoResponse {
    let model = model_action
        .split_once(':')
        .map(|(model, _)| model.to_string())
        .unwrap_or(model_action);
    let prompt = request["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    state.requests.lock().unwrap().push(RecordedRequest {
        model,
        api_key,
        prompt,
    });

    (state.status, Json(state.body.clone()))
}
