//! Malformed tool-call recovery.
//!
//! Some hosted Llama deployments (Groq in particular) reject a turn with
//! `tool_use_failed` when the model writes its function call as text
//! instead of structured output, and hand the raw text back as
//! `failed_generation`. The call is usually still legible:
//!
//! ```text
//! <function=read_dir>{"path": "~"}</function>
//! <function=read_dir{"path": "~"}></function>
//! <function>read_dir{"path": "~"}</function>
//! <function=read_dir>"~"</function>
//! <function=read_dir>{"~"}</function>
//! ```
//!
//! We scan for these blocks, accept only tools that were offered in the
//! request, and return the first call that parses.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use wayfarer_core::{ProviderError, ProviderRequest, ProviderResponse, ToolCall, ToolDefinition};

static FUNCTION_BLOCK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)<function(?:=|>)\s*([A-Za-z_][A-Za-z0-9_\-]*)\s*>?(.*?)(?:</function>|$)").ok()
});

static LOOSE_PAIR: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#""([A-Za-z_][A-Za-z0-9_]*)"\s*:\s*(?:"((?:[^"\\]|\\.)*)"|([^,}\s"][^,}]*))"#).ok()
});

/// Try to turn raw model output into a single tool call.
pub fn recover_tool_call(text: &str, tools: &[ToolDefinition]) -> Option<ToolCall> {
    let blocks = FUNCTION_BLOCK.as_ref()?;
    for caps in blocks.captures_iter(text) {
        let name = &caps[1];
        let Some(def) = tools.iter().find(|t| t.name == name) else {
            debug!(tool = name, "Recovered function block names an unavailable tool");
            continue;
        };

        match parse_body(&caps[2], def) {
            Some(arguments) => {
                return Some(ToolCall {
                    id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                    name: def.name.to_string(),
                    arguments,
                });
            }
            None => debug!(tool = name, "Could not parse recovered function body"),
        }
    }
    None
}

/// Best-effort argument parsing for a recovered function body.
fn parse_body(raw: &str, def: &ToolDefinition) -> Option<Value> {
    let body = raw
        .trim()
        .trim_end_matches('>')
        .trim()
        .trim_start_matches([',', '('])
        .trim_end_matches(')')
        .trim();

    if body.is_empty() {
        return Some(Value::Object(Map::new()));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(obj @ Value::Object(_)) => Some(obj),
        Ok(Value::Array(mut items)) if items.len() == 1 => wrap_primary(items.remove(0), def),
        Ok(bare) => wrap_primary(bare, def),
        Err(_) if body.starts_with('{') => salvage_object(body, def),
        Err(_) => {
            // Unquoted bare value
            let bare = body.trim_matches(|c| c == '"' || c == '\'');
            wrap_primary(Value::String(bare.to_string()), def)
        }
    }
}

/// Salvage a degenerate object: loose `"key": value` pairs first, then a
/// lone value such as `{"~"}`.
fn salvage_object(body: &str, def: &ToolDefinition) -> Option<Value> {
    let pairs = LOOSE_PAIR.as_ref()?;
    let mut map = Map::new();
    for pair in pairs.captures_iter(body) {
        let value = match (pair.get(2), pair.get(3)) {
            (Some(quoted), _) => quoted.as_str().replace("\\\"", "\""),
            (None, Some(bare)) => bare.as_str().trim().to_string(),
            _ => continue,
        };
        map.insert(pair[1].to_string(), Value::String(value));
    }
    if !map.is_empty() {
        return Some(Value::Object(map));
    }

    let inner = body.trim_start_matches('{').trim_end_matches('}').trim();
    let lone = match inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(quoted) if !quoted.contains('"') => quoted,
        None if !inner.is_empty() && !inner.contains([',', ':', '"']) => inner,
        _ => return None,
    };
    wrap_primary(Value::String(lone.to_string()), def)
}

fn wrap_primary(value: Value, def: &ToolDefinition) -> Option<Value> {
    let param = def.primary_param()?;
    let mut map = Map::new();
    map.insert(param.name.to_string(), value);
    Some(Value::Object(map))
}

/// Turn a `tool_use_failed` rejection into a normal tool-call response when
/// the rejected generation can be salvaged; otherwise return the error.
pub fn recover_response(
    error: ProviderError,
    request: &ProviderRequest,
) -> Result<ProviderResponse, ProviderError> {
    let generation = match &error {
        ProviderError::ToolCallMalformed {
            failed_generation: Some(text),
            ..
        } => Some(text.clone()),
        _ => None,
    };
    let Some(generation) = generation else {
        return Err(error);
    };

    match recover_tool_call(&generation, &request.tools) {
        Some(call) => {
            info!(tool = %call.name, "Recovered tool call from rejected generation");
            Ok(ProviderResponse {
                text: None,
                tool_calls: vec![call],
                model: request.model.clone(),
                usage: None,
                recovered: true,
            })
        }
        None => {
            warn!("Rejected generation held no recoverable tool call");
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wayfarer_core::{Message, ParamType, ToolCategory, ToolParam};

    const READ_DIR: ToolDefinition = ToolDefinition {
        name: "read_dir",
        description: "List a directory",
        category: ToolCategory::Filesystem,
        params: &[ToolParam::required("path", ParamType::String, "Directory")],
        dangerous: false,
        confirm: None,
    };

    const CLIPBOARD_READ: ToolDefinition = ToolDefinition {
        name: "clipboard_read",
        description: "Read the clipboard",
        category: ToolCategory::Clipboard,
        params: &[],
        dangerous: false,
        confirm: None,
    };

    fn tools() -> Vec<ToolDefinition> {
        vec![READ_DIR, CLIPBOARD_READ]
    }

    #[test]
    fn equals_form() {
        let call = recover_tool_call(r#"<function=read_dir>{"path": "~/Documents"}</function>"#, &tools()).unwrap();
        assert_eq!(call.name, "read_dir");
        assert_eq!(call.arguments, json!({"path": "~/Documents"}));
        assert!(call.id.starts_with("call_"));
    }

    #[test]
    fn glued_form() {
        let call = recover_tool_call(r#"<function=read_dir{"path": "/tmp"}></function>"#, &tools()).unwrap();
        assert_eq!(call.arguments, json!({"path": "/tmp"}));
    }

    #[test]
    fn tag_form() {
        let call = recover_tool_call(r#"<function>read_dir{"path": "/tmp"}</function>"#, &tools()).unwrap();
        assert_eq!(call.name, "read_dir");
        assert_eq!(call.arguments["path"], "/tmp");
    }

    #[test]
    fn bare_value_maps_to_primary_param() {
        let quoted = recover_tool_call(r#"<function=read_dir>"~"</function>"#, &tools()).unwrap();
        assert_eq!(quoted.arguments, json!({"path": "~"}));

        let unquoted = recover_tool_call("<function=read_dir>~/Downloads</function>", &tools()).unwrap();
        assert_eq!(unquoted.arguments, json!({"path": "~/Downloads"}));
    }

    #[test]
    fn degenerate_object_salvaged() {
        let call = recover_tool_call(r#"<function=read_dir>{"path": "~", }</function>"#, &tools()).unwrap();
        assert_eq!(call.arguments, json!({"path": "~"}));
    }

    #[test]
    fn lone_value_in_braces_maps_to_primary_param() {
        let call = recover_tool_call(r#"<function=read_dir>{"~"}</function>"#, &tools()).unwrap();
        assert_eq!(call.arguments, json!({"path": "~"}));

        let glued = recover_tool_call(r#"<function=read_dir{"~/Desktop"}></function>"#, &tools()).unwrap();
        assert_eq!(glued.arguments, json!({"path": "~/Desktop"}));
    }

    #[test]
    fn unquoted_value_after_key_is_salvaged() {
        let call = recover_tool_call(r#"<function=read_dir>{"path": ~}</function>"#, &tools()).unwrap();
        assert_eq!(call.arguments, json!({"path": "~"}));

        let mixed = recover_tool_call(r#"<function=read_dir>{"path": ~/Music, "x": "y"}</function>"#, &tools()).unwrap();
        assert_eq!(mixed.arguments, json!({"path": "~/Music", "x": "y"}));
    }

    #[test]
    fn single_element_array_is_unwrapped() {
        let call = recover_tool_call(r#"<function=read_dir>["~"]</function>"#, &tools()).unwrap();
        assert_eq!(call.arguments, json!({"path": "~"}));
    }

    #[test]
    fn braces_with_noise_recover_nothing() {
        assert!(recover_tool_call(r#"<function=read_dir>{"a" "b"}</function>"#, &tools()).is_none());
    }

    #[test]
    fn empty_body_is_empty_arguments() {
        let call = recover_tool_call("<function=clipboard_read></function>", &tools()).unwrap();
        assert_eq!(call.arguments, json!({}));
    }

    #[test]
    fn unknown_tool_is_skipped() {
        assert!(recover_tool_call(r#"<function=rm_rf>{"path": "/"}</function>"#, &tools()).is_none());
        let call = recover_tool_call(
            r#"<function=rm_rf>{}</function> then <function=read_dir>{"path": "~"}</function>"#,
            &tools(),
        )
        .unwrap();
        assert_eq!(call.name, "read_dir");
    }

    #[test]
    fn only_first_call_returned() {
        let text = r#"<function=read_dir>{"path": "a"}</function><function=read_dir>{"path": "b"}</function>"#;
        let call = recover_tool_call(text, &tools()).unwrap();
        assert_eq!(call.arguments["path"], "a");
    }

    #[test]
    fn unclosed_block() {
        let call = recover_tool_call(r#"Sure! <function=read_dir>{"path": "~"}"#, &tools()).unwrap();
        assert_eq!(call.arguments["path"], "~");
    }

    #[test]
    fn plain_text_recovers_nothing() {
        assert!(recover_tool_call("I cannot do that.", &tools()).is_none());
    }

    #[test]
    fn recover_response_marks_recovered() {
        let request = ProviderRequest::new("llama", vec![Message::user("ls ~")]).with_tools(tools());
        let error = ProviderError::ToolCallMalformed {
            status_code: 400,
            failed_generation: Some(r#"<function=read_dir>{"path": "~"}</function>"#.into()),
        };
        let response = recover_response(error, &request).unwrap();
        assert!(response.recovered);
        assert_eq!(response.tool_calls.len(), 1);
        assert!(response.text.is_none());
    }

    #[test]
    fn recover_response_passes_other_errors_through() {
        let request = ProviderRequest::new("llama", vec![]).with_tools(tools());
        let no_generation = ProviderError::ToolCallMalformed {
            status_code: 400,
            failed_generation: None,
        };
        assert!(recover_response(no_generation, &request).is_err());

        let other = ProviderError::ContextTooLong;
        assert!(matches!(
            recover_response(other, &request),
            Err(ProviderError::ContextTooLong)
        ));
    }
}
