//! Tool definitions, calls, results, and the executor boundary.
//!
//! The catalog of [`ToolDefinition`]s is static and provider-agnostic; the
//! schema translator turns it into each backend's function-calling shape.
//! Executing a tool is delegated to a [`ToolExecutor`] collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::ToolError;

/// Grouping used for access-level filtering and auto-approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Shell,
    Filesystem,
    Applescript,
    Http,
    Memory,
    Clipboard,
    System,
}

impl ToolCategory {
    /// Every category, in display order.
    pub const ALL: [ToolCategory; 7] = [
        ToolCategory::Shell,
        ToolCategory::Filesystem,
        ToolCategory::Applescript,
        ToolCategory::Http,
        ToolCategory::Memory,
        ToolCategory::Clipboard,
        ToolCategory::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shell => "shell",
            Self::Filesystem => "filesystem",
            Self::Applescript => "applescript",
            Self::Http => "http",
            Self::Memory => "memory",
            Self::Clipboard => "clipboard",
            Self::System => "system",
        }
    }

    /// Categories that can run arbitrary code on the host.
    pub fn runs_code(&self) -> bool {
        matches!(self, Self::Shell | Self::Applescript)
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    /// An array whose items have the given type.
    Array(&'static ParamType),
}

impl ParamType {
    /// JSON Schema type name.
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array(_) => "array",
        }
    }
}

/// One parameter of a tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolParam {
    pub name: &'static str,
    pub kind: ParamType,
    pub description: &'static str,
    pub required: bool,
    /// Allowed values, if the parameter is an enumeration.
    pub enum_values: &'static [&'static str],
}

impl ToolParam {
    pub const fn required(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
            enum_values: &[],
        }
    }

    pub const fn optional(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            enum_values: &[],
        }
    }

    pub const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.enum_values = values;
        self
    }
}

/// Renders a human-readable confirmation prompt from tool arguments.
pub type ConfirmRenderer = fn(&Value) -> String;

/// A tool the model may call. Defined once per process lifetime.
#[derive(Debug, Clone, Copy)]
pub struct ToolDefinition {
    /// Unique tool name (sent to the LLM)
    pub name: &'static str,

    /// Description of what the tool does (sent to the LLM)
    pub description: &'static str,

    pub category: ToolCategory,

    /// Ordered parameter list
    pub params: &'static [ToolParam],

    /// Whether running the tool can cause damage that needs a human's OK
    pub dangerous: bool,

    pub confirm: Option<ConfirmRenderer>,
}

impl ToolDefinition {
    /// The parameter a lone bare value should be mapped onto.
    ///
    /// First required parameter, falling back to the first parameter.
    pub fn primary_param(&self) -> Option<&'static ToolParam> {
        self.params
            .iter()
            .find(|p| p.required)
            .or_else(|| self.params.first())
    }

    /// Human-readable text shown when asking the user to approve a call.
    pub fn confirmation_message(&self, arguments: &Value) -> String {
        match self.confirm {
            Some(render) => render(arguments),
            None => format!("Allow {} with arguments {}?", self.name, arguments),
        }
    }
}

/// A request to execute a tool, as produced by the completion adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON object
    pub arguments: Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// The tool executor boundary.
///
/// Implementations perform the side effect and must enforce their own
/// resource limits; the agent loop only truncates what it feeds back to
/// the model.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute the named tool with the given argument object.
    async fn execute(&self, name: &str, arguments: &Value) -> std::result::Result<ToolResult, ToolError>;
}

/// Parse a serialized argument object defensively.
///
/// Malformed JSON, or JSON that is not an object, yields `{}`.
pub fn parse_arguments(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) | Err(_) => {
            if !raw.trim().is_empty() {
                tracing::debug!(raw = %raw, "Discarding non-object tool arguments");
            }
            Value::Object(serde_json::Map::new())
        }
    }
}

/// Marker appended to truncated output.
pub const TRUNCATION_MARKER: &str = "… [truncated]";

/// Truncate `text` to at most `max_chars` characters, appending a marker
/// when anything was cut.
pub fn truncate_output(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const READ_PARAMS: &[ToolParam] = &[
        ToolParam::optional("encoding", ParamType::String, "Text encoding"),
        ToolParam::required("path", ParamType::String, "File path"),
    ];

    const READ_FILE: ToolDefinition = ToolDefinition {
        name: "read_file",
        description: "Read a file",
        category: ToolCategory::Filesystem,
        params: READ_PARAMS,
        dangerous: false,
        confirm: None,
    };

    #[test]
    fn primary_param_prefers_required() {
        assert_eq!(READ_FILE.primary_param().unwrap().name, "path");
    }

    #[test]
    fn default_confirmation_message_mentions_tool() {
        let msg = READ_FILE.confirmation_message(&serde_json::json!({"path": "/tmp/a"}));
        assert!(msg.contains("read_file"));
        assert!(msg.contains("/tmp/a"));
    }

    #[test]
    fn parse_arguments_is_defensive() {
        assert_eq!(parse_arguments(r#"{"path":"~"}"#)["path"], "~");
        assert_eq!(parse_arguments("{not json"), serde_json::json!({}));
        assert_eq!(parse_arguments("[1,2]"), serde_json::json!({}));
        assert_eq!(parse_arguments(""), serde_json::json!({}));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_output("short", 10), "short");
        let long = "é".repeat(12);
        let cut = truncate_output(&long, 10);
        assert!(cut.starts_with(&"é".repeat(10)));
        assert!(cut.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn category_serialization() {
        let json = serde_json::to_string(&ToolCategory::Applescript).unwrap();
        assert_eq!(json, r#""applescript""#);
        assert!(ToolCategory::Shell.runs_code());
        assert!(!ToolCategory::Http.runs_code());
    }
}
