//! LLM request types
//!
//! These types are backend-agnostic and used across all LLM implementations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single LLM invocation
///
/// When `response_json_schema` is set the backend must return parsed JSON
/// conforming to it; otherwise the reply is free text wrapped in
/// `Value::String`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub prompt: String,
    /// Optional system instructions sent ahead of the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// JSON Schema the response must follow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_json_schema: Option<Value>,
    /// Files the model should read (e.g. an uploaded PDF statement)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_urls: Vec<String>,
}

impl InvokeRequest {
    /// Free-text request
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Structured request with a response schema
    pub fn structured(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            response_json_schema: Some(schema),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        let system = system.into();
        if !system.is_empty() {
            self.system = Some(system);
        }
        self
    }

    pub fn with_file_url(mut self, url: impl Into<String>) -> Self {
        self.file_urls.push(url.into());
        self
    }
}
