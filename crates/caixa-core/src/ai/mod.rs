//! Pluggable LLM backend abstraction
//!
//! This module provides a backend-agnostic interface for LLM invocation.
//! The import pipeline, categorizer and financial advisor only ever see
//! `LlmBackend::invoke`: a prompt, an optional JSON Schema for the reply and
//! optional file references.
//!
//! # Architecture
//!
//! - `LlmBackend` trait: the single invocation contract
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai_compatible, mock). Default: openai_compatible
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (default: https://api.openai.com when an API key is set)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-4o-mini)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required

mod mock;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::{MockBackend, MockReply};
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Trait defining the interface for all LLM backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run one LLM call
    ///
    /// Returns parsed JSON when the request carries a response schema,
    /// otherwise the reply text as `Value::String`.
    async fn invoke(&self, request: &InvokeRequest) -> Result<Value>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete LLM client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI chat completions API or any compatible server
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an LLM client from environment variables
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        Self::from_env_with_timeout(None)
    }

    /// Same as `from_env`, applying a request timeout to HTTP backends
    pub fn from_env_with_timeout(timeout: Option<Duration>) -> Option<Self> {
        let backend =
            std::env::var("AI_BACKEND").unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_env().map(|b| {
                    let b = match timeout {
                        Some(t) => b.with_timeout(t),
                        None => b,
                    };
                    AIClient::OpenAICompatible(b)
                })
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(
                    backend = %backend,
                    "Unknown AI_BACKEND, falling back to openai_compatible"
                );
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

// Implement LlmBackend for AIClient by delegating to the inner backend
#[async_trait]
impl LlmBackend for AIClient {
    async fn invoke(&self, request: &InvokeRequest) -> Result<Value> {
        match self {
            AIClient::OpenAICompatible(b) => b.invoke(request).await,
            AIClient::Mock(b) => b.invoke(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
