//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly.
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks
//! - Streaming via SSE `content_block_delta` events

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

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "anthropic".into(),
            base_url: ANTHROPIC_BASE_URL.into(),
            api_key: api_key.into(),
            client: http::client(http::DEFAULT_TIMEOUT),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    /// Extract system messages from the message list.
    /// Anthropic puts the system prompt in a top-level field, not in messages.
    fn extract_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut non_system: Vec<&Message> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(msg.text()),
                _ => non_system.push(msg),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, non_system)
    }

    /// Convert messages to Anthropic API format with content blocks.
    ///
    /// Consecutive tool results are merged into one `user` turn, since the
    /// API requires strictly alternating roles.
    fn to_api_messages(messages: &[&Message]) -> Vec<AnthropicMessage> {
        let mut result: Vec<AnthropicMessage> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::User => {
                    result.push(AnthropicMessage {
                        role: "user".into(),
                        content: AnthropicContent::Text(msg.text().to_string()),
                    });
                }
                Role::Assistant => {
                    if msg.tool_calls.is_empty() {
                        // Empty assistant text is rejected by the API
                        if msg.text().is_empty() {
                            continue;
                        }
                        result.push(AnthropicMessage {
                            role: "assistant".into(),
                            content: AnthropicContent::Text(msg.text().to_string()),
                        });
                    } else {
                        let mut blocks: Vec<ContentBlock> = Vec::new();
                        if let Some(text) = msg.content.as_deref().filter(|t| !t.is_empty()) {
                            blocks.push(ContentBlock::Text { text: text.to_string() });
                        }
                        for tc in &msg.tool_calls {
                            blocks.push(ContentBlock::ToolUse {
                                id: tc.id.clone(),
                                name: tc.name.clone(),
                                input: parse_arguments(&tc.arguments),
                            });
                        }
                        result.push(AnthropicMessage {
                            role: "assistant".into(),
                            content: AnthropicContent::Blocks(blocks),
                        });
                    }
                }
                Role::Tool => {
                    let block = ContentBlock::ToolResult {
                        tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                        content: msg.text().to_string(),
                    };
                    match result.last_mut() {
                        Some(AnthropicMessage {
                            role,
                            content: AnthropicContent::Blocks(blocks),
                        }) if role.as_str() == "user" => blocks.push(block),
                        _ => result.push(AnthropicMessage {
                            role: "user".into(),
                            content: AnthropicContent::Blocks(vec![block]),
                        }),
                    }
                }
                Role::System => {} // handled separately
            }
        }

        result
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> Value {
        let (system, messages) = Self::extract_system(&request.messages);

        let mut body = json!({
            "model": request.model,
            "messages": Self::to_api_messages(&messages),
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if stream {
            body["stream"] = json!(true);
        }

        if let Some(sys) = system {
            body["system"] = json!(sys);
        }

        if let Some(temperature) = request.temperature {
            // Anthropic caps temperature at 1.0
            body["temperature"] = json!(temperature.min(1.0));
        }

        if !request.tools.is_empty() {
            body["tools"] = json!(schema::translate(&request.tools, SchemaFlavor::InputSchema));
            body["tool_choice"] = json!({
                "type": "auto",
                "disable_parallel_tool_use": true,
            });
        }

        body
    }

    /// Convert an Anthropic API response to our ProviderResponse.
    fn parse_response(json: Value) -> Result<ProviderResponse, ProviderError> {
        let resp: AnthropicResponse = serde_json::from_value(json).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        let mut text_content = String::new();
        let mut tool_calls = Vec::new();

        for block in resp.content {
            match block {
                ResponseContentBlock::Text { text } => {
                    if !text_content.is_empty() {
                        text_content.push('\n');
                    }
                    text_content.push_str(&text);
                }
                ResponseContentBlock::ToolUse { id, name, input } => {
                    let arguments = match input {
                        obj @ Value::Object(_) => obj,
                        _ => Value::Object(serde_json::Map::new()),
                    };
                    tool_calls.push(ToolCall { id, name, arguments });
                }
                ResponseContentBlock::Other => {}
            }
        }

        let usage = resp
            .usage
            .map(|u| Usage::new(u.input_tokens, u.output_tokens));

        Ok(ProviderResponse {
            text: (!text_content.trim().is_empty()).then_some(text_content),
            tool_calls,
            model: resp.model,
            usage,
            recovered: false,
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::request_body(&request, false);
        let target = Target {
            provider: &self.name,
            model: &request.model,
        };

        debug!(
            provider = "anthropic",
            model = %request.model,
            tools = request.tools.len(),
            "Sending completion request"
        );

        match http::post_json(&target, self.post(&url), &body).await {
            Ok(json) => Self::parse_response(json),
            Err(e) => recovery::recover_response(e, &request),
        }
    }

    async fn stream_text(&self, request: ProviderRequest) -> Result<TextStream, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::request_body(&request, true);
        let target = Target {
            provider: &self.name,
            model: &request.model,
        };

        debug!(provider = "anthropic", model = %request.model, "Sending streaming request");

        let response = http::post_stream(
            &target,
            self.post(&url).header("Accept", "text/event-stream"),
            &body,
        )
        .await?;

        let deltas = sse_stream(response.bytes_stream(), |event: &Value| {
            if event["type"] != "content_block_delta" || event["delta"]["type"] != "text_delta" {
                return None;
            }
            event["delta"]["text"].as_str().map(String::from)
        });
        Ok(deltas.boxed())
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    #[serde(default)]
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
