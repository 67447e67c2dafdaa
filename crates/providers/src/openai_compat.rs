//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI itself and any server exposing an OpenAI-style
//! `/chat/completions` endpoint (Groq, LM Studio, vLLM, llama.cpp,
//! OpenRouter, ...).
//!
//! Supports:
//! - Chat completions with function calling
//! - Streaming text over SSE
//! - Recovery of tool calls the server rejected as malformed

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use wayfarer_core::message::{Message, Role};
use wayfarer_core::provider::*;
use wayfarer_core::schema::{self, SchemaFlavor};
use wayfarer_core::tool::{ToolCall, parse_arguments};
use wayfarer_core::ProviderError;
use crate::http::{self, Target};
use crate::recovery;
use crate::stream::sse_stream;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    kind: ProviderKind,
    base_url: String,
    api_key: Option<String>,
    /// Send `parallel_tool_calls: false` (only OpenAI proper accepts it)
    single_tool_call_flag: bool,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            single_tool_call_flag: false,
            client: http::client(http::DEFAULT_TIMEOUT),
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        let mut provider = Self::new("openai", ProviderKind::OpenAi, OPENAI_BASE_URL, Some(api_key.into()));
        provider.single_tool_call_flag = true;
        provider
    }

    /// Create a provider for any OpenAI-compatible server.
    pub fn compatible(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::new("openai_compatible", ProviderKind::OpenAiCompatible, base_url, api_key)
    }

    /// Override the base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: match m.role {
                    // Tool and user turns must carry a string
                    Role::Tool | Role::User | Role::System => Some(m.text().to_string()),
                    Role::Assistant => m.content.clone(),
                },
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: Some(tc.id.clone()),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: Value::String(tc.arguments.clone()),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn request_body(&self, request: &ProviderRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": stream,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        if !request.tools.is_empty() {
            body["tools"] = json!(schema::translate(&request.tools, SchemaFlavor::Function));
            if self.single_tool_call_flag {
                body["parallel_tool_calls"] = json!(false);
            }
        }

        body
    }

    fn parse_response(json: Value, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let api_response: ApiResponse = serde_json::from_value(json)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: tc.function.name,
                arguments: normalize_arguments(tc.function.arguments),
            })
            .collect();

        let usage = api_response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens));

        Ok(ProviderResponse {
            text: choice.message.content.filter(|t| !t.trim().is_empty()),
            tool_calls,
            model: api_response.model.unwrap_or_else(|| requested_model.to_string()),
            usage,
            recovered: false,
        })
    }
}

/// Arguments arrive as a JSON-encoded string (OpenAI) or, from some
/// compatible servers, as a native object.
fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::String(raw) => parse_arguments(&raw),
        obj @ Value::Object(_) => obj,
        _ => Value::Object(serde_json::Map::new()),
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request, false);
        let target = Target {
            provider: &self.name,
            model: &request.model,
        };

        debug!(
            provider = %self.name,
            model = %request.model,
            tools = request.tools.len(),
            "Sending completion request"
        );

        match http::post_json(&target, self.post(&url), &body).await {
            Ok(json) => Self::parse_response(json, &request.model),
            Err(e) => recovery::recover_response(e, &request),
        }
    }

    async fn stream_text(&self, request: ProviderRequest) -> Result<TextStream, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request, true);
        let target = Target {
            provider: &self.name,
            model: &request.model,
        };

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = http::post_stream(
            &target,
            self.post(&url).header("Accept", "text/event-stream"),
            &body,
        )
        .await?;

        let deltas = sse_stream(response.bytes_stream(), |chunk: &Value| {
            chunk["choices"][0]["delta"]["content"]
                .as_str()
                .map(String::from)
        });
        Ok(deltas.boxed())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
