//! Mock backend for testing
//!
//! Replies are scripted: each `invoke` pops the next queued reply. Every
//! request is recorded so tests can assert on how many calls a stage made
//! and what it sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};

use super::types::InvokeRequest;
use super::LlmBackend;

/// A scripted mock reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Structured JSON reply
    Json(Value),
    /// Free-text reply
    Text(String),
    /// The call fails with this message
    Fail(String),
}

#[derive(Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    calls: Vec<InvokeRequest>,
}

/// Mock LLM backend for testing
///
/// Clones share the same reply queue and call log.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Queue a reply for the next unanswered call
    pub fn push(&self, reply: MockReply) {
        if let Ok(mut state) = self.state.lock() {
            state.replies.push_back(reply);
        }
    }

    pub fn push_json(&self, value: Value) {
        self.push(MockReply::Json(value));
    }

    pub fn push_text(&self, text: &str) {
        self.push(MockReply::Text(text.to_string()));
    }

    pub fn push_failure(&self, message: &str) {
        self.push(MockReply::Fail(message.to_string()));
    }

    /// Requests received so far, in order
    pub fn calls(&self) -> Vec<InvokeRequest> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().map(|s| s.calls.len()).unwrap_or(0)
    }

    /// Drop queued replies and the call log
    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.replies.clear();
            state.calls.clear();
        }
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn invoke(&self, request: &InvokeRequest) -> Result<Value> {
        let reply = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| Error::Llm("Mock state lock poisoned".into()))?;
            state.calls.push(request.clone());
            state.replies.pop_front()
        };

        match reply {
            Some(MockReply::Json(value)) => Ok(value),
            Some(MockReply::Text(text)) => Ok(Value::String(text)),
            Some(MockReply::Fail(message)) => Err(Error::Llm(message)),
            // Nothing scripted: structured calls get null, free text a canned answer
            None if request.response_json_schema.is_some() => Ok(Value::Null),
            None => Ok(Value::String("Mock response".to_string())),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
