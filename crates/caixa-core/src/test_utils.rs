//! Test utilities for caixa-core
//!
//! A mock OpenAI-compatible server that replays scripted completions, for
//! backend tests and end-to-end runs of the import pipeline.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<Value>>>,
    count: Arc<AtomicUsize>,
}

/// Mock OpenAI-compatible server
///
/// Each `POST /v1/chat/completions` pops the next scripted reply as the
/// assistant message content. Once the script runs out, replies are `{}`.
pub struct MockLlmServer {
    addr: SocketAddr,
    state: MockState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockLlmServer {
    /// Start the mock server on an available port
    pub async fn start(replies: Vec<String>) -> Self {
        let state = MockState {
            replies: Arc::new(Mutex::new(replies.into())),
            ..MockState::default()
        };

        let app = Router::new()
            .route("/v1/chat/completions", post(handle_chat))
            .route("/v1/models", get(handle_models))
            .route("/health", get(|| async { "ok" }))
            .with_state(state.clone());

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
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of chat completion requests served
    pub fn request_count(&self) -> usize {
        self.state.count.load(Ordering::SeqCst)
    }

    /// Request bodies received, oldest first
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockLlmServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_chat(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.count.fetch_add(1, Ordering::SeqCst);
    let model = body["model"].as_str().unwrap_or("mock").to_string();
    state.requests.lock().unwrap().push(body);

    let content = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| "{}".to_string());

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}

async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{"id": "gpt-4o-mini", "object": "model"}]
    }))
}
