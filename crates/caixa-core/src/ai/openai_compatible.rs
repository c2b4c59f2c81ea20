//! OpenAI-compatible backend implementation
//!
//! Works with the OpenAI API and any server that implements the chat
//! completions endpoint (vLLM, LocalAI, llama-server, ...).
//!
//! Structured requests use `response_format: json_schema`; file references
//! are fetched and inlined as base64 `file` parts.
//!
//! # Configuration
//!
//! Environment variables:
//! - `OPENAI_COMPATIBLE_HOST`: Server URL
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-4o-mini)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::read_file_url;

use super::parsing::extract_json;
use super::types::InvokeRequest;
use super::LlmBackend;

/// Default API host when only an API key is configured
pub const DEFAULT_HOST: &str = "https://api.openai.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible backend
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new(base_url, model)
        }
    }

    /// Create a new instance whose requests time out after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let http_client = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to build HTTP client with timeout, keeping previous client"
                );
                self.http_client.clone()
            }
        };
        Self {
            http_client,
            ..self.clone()
        }
    }

    /// Create from environment variables
    ///
    /// Needs `OPENAI_COMPATIBLE_HOST`, or `OPENAI_COMPATIBLE_API_KEY` alone
    /// (which targets the OpenAI API).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_COMPATIBLE_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        let host = match std::env::var("OPENAI_COMPATIBLE_HOST") {
            Ok(host) if !host.is_empty() => host,
            _ if api_key.is_some() => DEFAULT_HOST.to_string(),
            _ => return None,
        };
        let model = std::env::var("OPENAI_COMPATIBLE_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let mut backend = Self::new(&host, &model);
        backend.api_key = api_key;
        Some(backend)
    }

    /// Build the chat completion request body for an invocation
    async fn build_request(&self, request: &InvokeRequest) -> Result<ChatCompletionRequest> {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: ChatContent::Text(system.clone()),
            });
        }

        let content = if request.file_urls.is_empty() {
            ChatContent::Text(request.prompt.clone())
        } else {
            let mut parts = vec![ContentPart::Text {
                text: request.prompt.clone(),
            }];
            for url in &request.file_urls {
                parts.push(self.file_part(url).await?);
            }
            ChatContent::Parts(parts)
        };
        messages.push(ChatMessage {
            role: "user".to_string(),
            content,
        });

        let response_format = request.response_json_schema.as_ref().map(|schema| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "schema": schema,
                }
            })
        });

        Ok(ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.1),
            max_tokens: None,
            response_format,
            stream: false,
        })
    }

    /// Fetch a referenced file and inline it as a content part
    async fn file_part(&self, url: &str) -> Result<ContentPart> {
        let bytes = read_file_url(&self.http_client, url).await?;
        let filename = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("statement")
            .to_string();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

        Ok(ContentPart::File {
            file: FileData {
                filename,
                file_data: format!("data:application/pdf;base64,{}", encoded),
            },
        })
    }

    /// Make a chat completion request and return the reply text
    async fn chat_completion(&self, request: &ChatCompletionRequest) -> Result<String> {
        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("OpenAI API error {}: {}", status, body)));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("No response from OpenAI API".into()))
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    stream: bool,
}

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: ChatContent,
}

/// Chat message content (text or multimodal)
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Content part for multimodal messages
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "file")]
    File { file: FileData },
}

/// Inline file for document input
#[derive(Debug, Serialize)]
struct FileData {
    filename: String,
    file_data: String,
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Chat response message
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmBackend for OpenAICompatibleBackend {
    async fn invoke(&self, request: &InvokeRequest) -> Result<Value> {
        let body = self.build_request(request).await?;
        let reply = self.chat_completion(&body).await?;
        debug!(model = %self.model, chars = reply.len(), "OpenAI-compatible response");

        if request.response_json_schema.is_some() {
            extract_json(&reply)
        } else {
            Ok(Value::String(reply))
        }
    }

    async fn health_check(&self) -> bool {
        let mut req = self.http_client.get(format!("{}/v1/models", self.base_url));
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        if let Ok(resp) = req.send().await {
            if resp.status().is_success() {
                return true;
            }
        }

        // Try /health (common for LocalAI and llama-server)
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        false
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLlmServer;

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = OpenAICompatibleBackend::new("http://localhost:12434/", "gpt-4o-mini");
        assert_eq!(backend.host(), "http://localhost:12434");
        assert_eq!(backend.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_backend_with_api_key() {
        let backend =
            OpenAICompatibleBackend::with_api_key("http://localhost:12434", "gpt-4o", "sk-test");
        assert_eq!(backend.api_key, Some("sk-test".to_string()));
        let timed = backend.with_timeout(Duration::from_secs(5));
        assert_eq!(timed.model(), "gpt-4o");
        assert_eq!(timed.api_key, Some("sk-test".to_string()));
    }

    #[tokio::test]
    async fn test_structured_request_body() {
        let backend = OpenAICompatibleBackend::new("http://localhost:1", "gpt-4o-mini");
        let request = InvokeRequest::structured("Extraia", json!({"type": "object"}))
            .with_system("Você é um assistente");
        let body = backend.build_request(&request).await.unwrap();
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Extraia");
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(
            json["response_format"]["json_schema"]["schema"]["type"],
            "object"
        );
        assert!(json.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn test_file_url_is_inlined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extrato.pdf");
        std::fs::write(&path, b"%PDF-1.4 fake").unwrap();
        let url = format!("file://{}", path.display());

        let backend = OpenAICompatibleBackend::new("http://localhost:1", "gpt-4o-mini");
        let request = InvokeRequest::structured("Extraia", json!({})).with_file_url(url);
        let body = backend.build_request(&request).await.unwrap();
        let json = serde_json::to_value(&body).unwrap();

        let parts = json["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "file");
        assert_eq!(parts[1]["file"]["filename"], "extrato.pdf");
        assert!(parts[1]["file"]["file_data"]
            .as_str()
            .unwrap()
            .starts_with("data:application/pdf;base64,"));
    }

    #[tokio::test]
    async fn test_invoke_against_mock_server() {
        let server = MockLlmServer::start(vec![
            r#"```json
{"categories": [{"index": 0, "category": "aluguel"}]}
```"#
                .to_string(),
            "Reduza custos fixos.".to_string(),
        ])
        .await;
        let backend = OpenAICompatibleBackend::new(&server.url(), "gpt-4o-mini");

        let structured = backend
            .invoke(&InvokeRequest::structured("categorize", json!({})))
            .await
            .unwrap();
        assert_eq!(structured["categories"][0]["category"], "aluguel");

        let text = backend
            .invoke(&InvokeRequest::text("conselho"))
            .await
            .unwrap();
        assert_eq!(text, "Reduza custos fixos.");
        assert_eq!(server.request_count(), 2);
        assert!(backend.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OpenAICompatibleBackend::new("http://localhost:1", "gpt-4o-mini");
        assert!(!backend.health_check().await);
    }

    #[test]
    fn test_chat_completion_response_null_content() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert!(response.choices[0].message.content.is_none());
    }
}
