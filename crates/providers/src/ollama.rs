//! Ollama native provider implementation.
//!
//! Talks to a local (or remote) Ollama daemon over `/api/chat`. No auth.
//! Tool-call arguments travel as native JSON objects in both directions
//! and calls carry no IDs, so we generate them.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;
use wayfarer_core::message::Message;
use wayfarer_core::provider::*;
use wayfarer_core::schema::{self, SchemaFlavor};
use wayfarer_core::tool::{ToolCall, parse_arguments};
use wayfarer_core::ProviderError;
use crate::http::{self, Target};
use crate::recovery;
use crate::stream::ndjson_stream;

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Ollama `/api/chat` provider.
pub struct OllamaProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the daemon at `base_url` (default `localhost:11434`).
    pub fn new(base_url: Option<&str>) -> Self {
        let base_url = base_url.unwrap_or(OLLAMA_BASE_URL);
        Self {
            name: "ollama".into(),
            base_url: normalize_base_url(base_url),
            client: http::client(http::DEFAULT_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn to_api_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_string(),
                content: m.text().to_string(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|tc| OllamaToolCall {
                        function: OllamaFunction {
                            name: tc.name.clone(),
                            arguments: parse_arguments(&tc.arguments),
                        },
                    })
                    .collect(),
                tool_name: m.name.clone(),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": stream,
        });

        let mut options = Map::new();
        if let Some(temperature) = request.temperature {
            options.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            options.insert("num_predict".into(), json!(max_tokens));
        }
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }

        if !request.tools.is_empty() {
            body["tools"] = json!(schema::translate(&request.tools, SchemaFlavor::Function));
        }

        body
    }

    fn parse_response(json: Value, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let resp: OllamaResponse = serde_json::from_value(json)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse Ollama response: {e}")))?;

        let tool_calls = resp
            .message
            .tool_calls
            .into_iter()
            .map(|tc| ToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                name: tc.function.name,
                arguments: match tc.function.arguments {
                    obj @ Value::Object(_) => obj,
                    Value::String(raw) => parse_arguments(&raw),
                    _ => Value::Object(Map::new()),
                },
            })
            .collect();

        let usage = match (resp.prompt_eval_count, resp.eval_count) {
            (Some(prompt), Some(completion)) => Some(Usage::new(prompt, completion)),
            _ => None,
        };

        Ok(ProviderResponse {
            text: Some(resp.message.content).filter(|t| !t.trim().is_empty()),
            tool_calls,
            model: resp.model.unwrap_or_else(|| requested_model.to_string()),
            usage,
            recovered: false,
        })
    }
}

/// `OLLAMA_HOST` is often given without a scheme, and some users paste
/// the OpenAI-compatible `/v1` URL.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/v1").unwrap_or(trimmed);
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = Self::request_body(&request, false);
        let target = Target {
            provider: &self.name,
            model: &request.model,
        };

        debug!(
            provider = "ollama",
            model = %request.model,
            tools = request.tools.len(),
            "Sending completion request"
        );

        match http::post_json(&target, self.client.post(&url), &body).await {
            Ok(json) => Self::parse_response(json, &request.model),
            Err(e) => recovery::recover_response(e, &request),
        }
    }

    async fn stream_text(&self, request: ProviderRequest) -> Result<TextStream, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = Self::request_body(&request, true);
        let target = Target {
            provider: &self.name,
            model: &request.model,
        };

        debug!(provider = "ollama", model = %request.model, "Sending streaming request");

        let response = http::post_stream(&target, self.client.post(&url), &body).await?;
        let deltas = ndjson_stream(response.bytes_stream(), |record: &Value| {
            record["message"]["content"].as_str().map(String::from)
        });
        Ok(deltas.boxed())
    }
}

// --- Ollama API types ---

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: Option<String>,
    message: OllamaResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}
