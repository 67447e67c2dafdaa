//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send one conversation turn to an LLM and get
//! back free text and/or tool calls, or stream text deltas.
//!
//! Implementations: OpenAI, Anthropic, Ollama, OpenAI-compatible endpoints.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::{ToolCall, ToolDefinition};

/// The backend families Wayfarer can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

impl ProviderKind {
    /// Every backend, in credential-probing order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::OpenAiCompatible,
        ProviderKind::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
            Self::OpenAiCompatible => "openai_compatible",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "openai_compatible" | "openai-compatible" | "compatible" | "custom" => {
                Ok(Self::OpenAiCompatible)
            }
            other => Err(ProviderError::NotConfigured(format!(
                "unknown provider '{other}'"
            ))),
        }
    }
}

/// The resolved backend and model string for one completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRoute {
    pub provider: ProviderKind,
    pub model: String,
}

impl std::fmt::Display for ModelRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// One completion turn.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o-mini", "claude-3-5-sonnet-latest")
    pub model: String,

    /// The conversation messages; a leading system message carries the
    /// system prompt
    pub messages: Vec<Message>,

    /// Tools the model may call (empty = no tool schema is sent)
    pub tools: Vec<ToolDefinition>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: Option<f32>,
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Look up one of the request's tools by name.
    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResponse {
    /// Free text generated by the model, if any
    pub text: Option<String>,

    /// Tool calls requested by the model, in order
    pub tool_calls: Vec<ToolCall>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Set when the tool call was salvaged from malformed model output
    pub recovered: bool,
}

impl ProviderResponse {
    pub fn text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A lazy, finite sequence of text deltas.
pub type TextStream = BoxStream<'static, String>;

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The agent loop calls
/// `complete()` without knowing which provider is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Which backend family this is.
    fn kind(&self) -> ProviderKind;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of text deltas.
    ///
    /// Default implementation calls `complete()` and yields its text once.
    async fn stream_text(&self, request: ProviderRequest) -> std::result::Result<TextStream, ProviderError> {
        let response = self.complete(request).await?;
        let text: Vec<String> = response.text.into_iter().collect();
        Ok(Box::pin(futures::stream::iter(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct Echo;

    #[async_trait]
    impl Provider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAiCompatible
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let last = request.messages.last().map(|m| m.text().to_string()).unwrap_or_default();
            Ok(ProviderResponse::text(request.model, last))
        }
    }

    #[test]
    fn provider_kind_parsing() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!(
            "openai-compatible".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenAiCompatible
        );
        assert!("gemini".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_kind_serde_names() {
        assert_eq!(serde_json::to_string(&ProviderKind::OpenAi).unwrap(), r#""openai""#);
        assert_eq!(
            serde_json::to_string(&ProviderKind::OpenAiCompatible).unwrap(),
            r#""openai_compatible""#
        );
    }

    #[tokio::test]
    async fn default_stream_yields_complete_text() {
        let request = ProviderRequest::new("m", vec![Message::user("ping")]);
        let chunks: Vec<String> = Echo.stream_text(request).await.unwrap().collect().await;
        assert_eq!(chunks, vec!["ping".to_string()]);
    }

    #[test]
    fn route_display() {
        let route = ModelRoute {
            provider: ProviderKind::Ollama,
            model: "llama3.1".into(),
        };
        assert_eq!(route.to_string(), "ollama/llama3.1");
    }
}
